//! HTML pages.
//!
//! Plain string templates; every interpolated value goes through
//! [`escape_html`].

use crate::generator::TagRequest;
use crate::validation::GarmentSize;
use crate::web::state::Flash;

const STYLE: &str = r#"
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }
nav a { margin-right: 1rem; }
.flash { padding: .5rem 1rem; border-radius: 4px; margin: .5rem 0; }
.flash.success { background: #e3f6e5; color: #1d5e27; }
.flash.error { background: #fbe4e4; color: #8a1f1f; }
label { display: block; margin-top: .75rem; }
input, select { width: 100%; padding: .4rem; }
button { margin-top: 1rem; padding: .5rem 1.25rem; }
img.feed { width: 100%; border: 1px solid #ccc; }
"#;

/// Escape text for use inside HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flashes: &[Flash], body: &str) -> String {
    let messages: String = flashes
        .iter()
        .map(|flash| {
            format!(
                r#"<div class="flash {}">{}</div>"#,
                flash.kind.css_class(),
                escape_html(&flash.message)
            )
        })
        .collect();

    format!(
        r#"<!doctype html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<nav><a href="/">Home</a><a href="/gerar_qr">Gerar QR Code</a><a href="/ler_qr">Ler QR Code</a></nav>
<h1>{title}</h1>
{messages}
{body}
</body>
</html>"#,
        title = escape_html(title),
    )
}

pub fn index(flashes: &[Flash], inventory_len: usize) -> String {
    let body = format!(
        r#"<p>Peças cadastradas nesta sessão: {inventory_len}</p>
<ul>
<li><a href="/gerar_qr">Cadastrar peça e gerar QR Code</a></li>
<li><a href="/ler_qr">Ler QR Code pela câmera</a></li>
<li><a href="/estoque">Estoque (JSON)</a></li>
</ul>"#
    );
    layout("Home", flashes, &body)
}

pub fn scan_page() -> String {
    let body = r#"<p>Aponte a câmera para a etiqueta.</p>
<img class="feed" src="/video_feed" alt="Câmera" onerror="window.location='/'">
<form method="post" action="/cancelar_qr"><button type="submit">Cancelar</button></form>
<script>
async function poll() {
  try {
    const r = await fetch('/scan_result', { cache: 'no-store', redirect: 'manual' });
    if (r.type === 'opaqueredirect' || r.status === 404) { window.location = '/'; return; }
  } catch (e) {}
  setTimeout(poll, 500);
}
setTimeout(poll, 500);
</script>"#;
    layout("Leitor QR-Code", &[], body)
}

fn size_options(selected: &str) -> String {
    GarmentSize::ALL
        .iter()
        .map(|size| {
            let mark = if size.as_str().eq_ignore_ascii_case(selected.trim()) {
                " selected"
            } else {
                ""
            };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, size.as_str(), mark)
        })
        .collect()
}

/// Registration form, optionally prefilled and followed by the generated tag.
pub fn generate_page(form: &TagRequest, messages: &[Flash], image_file_name: Option<&str>) -> String {
    let tag = image_file_name
        .map(|name| {
            let name = escape_html(name);
            format!(r#"<h2>QR Code</h2><img src="/static/{name}" alt="{name}"><p><a href="/static/{name}" download>Baixar {name}</a></p>"#)
        })
        .unwrap_or_default();

    let body = format!(
        r#"<form method="post" action="/gerar_qr">
<label>Produto <input name="produto" value="{produto}" required></label>
<label>Tamanho <select name="tamanho">{sizes}</select></label>
<label>Cor <input name="cor" value="{cor}" required></label>
<label>Tecido <input name="tecido" value="{tecido}" required></label>
<label>Preço <input name="preco" value="{preco}" inputmode="decimal" required></label>
<button type="submit">Gerar</button>
</form>
{tag}"#,
        produto = escape_html(&form.product),
        sizes = size_options(&form.size),
        cor = escape_html(&form.color),
        tecido = escape_html(&form.fabric),
        preco = escape_html(&form.price),
    );
    layout("Gerador QR Code", messages, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Calça" & 'Saia'</b>"#),
            "&lt;b&gt;&quot;Calça&quot; &amp; &#39;Saia&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn flashes_are_rendered_escaped() {
        let html = index(&[Flash::success("Informações do QR code: <x>")], 2);
        assert!(html.contains(r#"<div class="flash success">Informações do QR code: &lt;x&gt;</div>"#));
        assert!(html.contains("Peças cadastradas nesta sessão: 2"));
    }

    #[test]
    fn generate_page_keeps_input_and_selects_size() {
        let form = TagRequest {
            product: "Camisa".to_string(),
            size: "gg".to_string(),
            ..TagRequest::default()
        };
        let html = generate_page(&form, &[], Some("camisa_gg_azul_linho.png"));
        assert!(html.contains(r#"value="Camisa""#));
        assert!(html.contains(r#"<option value="GG" selected>GG</option>"#));
        assert!(html.contains(r#"src="/static/camisa_gg_azul_linho.png""#));
    }
}
