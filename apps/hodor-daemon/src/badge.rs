// badge.rs — Flat SVG status badge ("Deployed | v1.2.3").
//
// Text width is estimated from the character count; good enough for tags,
// which are short ASCII strings in practice.

/// Blue right-hand side, as shown for deployed tags.
pub const COLOR_BLUE: &str = "#007ec6";

const LABEL_COLOR: &str = "#555";
const CHAR_WIDTH: usize = 7;
const PADDING: usize = 10;

/// Render a two-part badge as an SVG document.
pub fn render(label: &str, value: &str, color: &str) -> String {
    let label_width = text_width(label);
    let value_width = text_width(value);
    let total_width = label_width + value_width;
    let label_x = label_width / 2;
    let value_x = label_width + value_width / 2;
    let label = escape(label);
    let value = escape(value);
    let color = escape(color);

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{total_width}" height="20" role="img" aria-label="{label}: {value}">
  <title>{label}: {value}</title>
  <linearGradient id="s" x2="0" y2="100%">
    <stop offset="0" stop-color="#bbb" stop-opacity=".1"/>
    <stop offset="1" stop-opacity=".1"/>
  </linearGradient>
  <clipPath id="r"><rect width="{total_width}" height="20" rx="3" fill="#fff"/></clipPath>
  <g clip-path="url(#r)">
    <rect width="{label_width}" height="20" fill="{LABEL_COLOR}"/>
    <rect x="{label_width}" width="{value_width}" height="20" fill="{color}"/>
    <rect width="{total_width}" height="20" fill="url(#s)"/>
  </g>
  <g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11">
    <text x="{label_x}" y="14">{label}</text>
    <text x="{value_x}" y="14">{value}</text>
  </g>
</svg>
"##
    )
}

fn text_width(text: &str) -> usize {
    text.chars().count() * CHAR_WIDTH + PADDING
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
