//! Small markup scanner for the pages this crate reads.
//!
//! It understands just enough HTML to locate elements by id, class or attribute,
//! walk descendants by tag name and read visible text. Markup is expected to be a
//! browser serialization (explicit closing tags); it is not a general parser.

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea"];

#[derive(Debug, Clone)]
struct Tag<'a> {
    start: usize,
    end: usize,
    name: String,
    closing: bool,
    self_closing: bool,
    raw: &'a str,
}

/// One element found in a markup string. Offsets are relative to the string the
/// search was run on.
#[derive(Debug, Clone)]
pub struct Element<'a> {
    tag: String,
    open_tag: &'a str,
    inner: &'a str,
    inner_start: usize,
    start: usize,
    end: usize,
}

impl<'a> Element<'a> {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Markup between the opening and closing tags.
    pub fn inner_html(&self) -> &'a str {
        self.inner
    }

    /// Offset of the opening `<`.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset just past the closing tag.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Offset of the closing tag (end of input for unclosed elements).
    pub fn inner_end(&self) -> usize {
        self.inner_start + self.inner.len()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        parse_attrs(self.open_tag)
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.map(|v| decode_entities(&v)).unwrap_or_default())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        parse_attrs(self.open_tag)
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Visible text with tags removed, entities decoded and whitespace collapsed.
    pub fn text(&self) -> String {
        visible_text(self.inner)
    }

    /// Hidden through an inline style or the `hidden` attribute.
    pub fn is_hidden(&self) -> bool {
        if self.has_attr("hidden") {
            return true;
        }
        let Some(style) = self.attr("style") else {
            return false;
        };
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    }

    pub fn find_by_class(&self, class: &str) -> Option<Element<'a>> {
        find_by_class(self.inner, class)
    }

    pub fn descendants(&self, tag: &str) -> Vec<Element<'a>> {
        descendants(self.inner, tag)
    }
}

pub fn find_by_id<'a>(s: &'a str, id: &str) -> Option<Element<'a>> {
    find_first(s, |tag| tag_attr(tag.raw, "id").as_deref() == Some(id))
}

pub fn find_by_class<'a>(s: &'a str, class: &str) -> Option<Element<'a>> {
    find_first(s, |tag| {
        tag_attr(tag.raw, "class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    })
}

pub fn find_by_attr<'a>(s: &'a str, attr: &str) -> Option<Element<'a>> {
    find_first(s, |tag| {
        parse_attrs(tag.raw)
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(attr))
    })
}

pub fn find_by_tag<'a>(s: &'a str, name: &str) -> Option<Element<'a>> {
    find_first(s, |tag| tag.name == name)
}

/// Every element named `tag` in document order, nested matches included.
pub fn descendants<'a>(s: &'a str, tag: &str) -> Vec<Element<'a>> {
    let name = tag.to_ascii_lowercase();
    Tags::new(s)
        .filter(|t| !t.closing && t.name == name)
        .map(|t| element_from(s, t))
        .collect()
}

fn find_first<'a>(s: &'a str, pred: impl Fn(&Tag<'a>) -> bool) -> Option<Element<'a>> {
    Tags::new(s)
        .find(|t| !t.closing && pred(t))
        .map(|t| element_from(s, t))
}

fn element_from<'a>(s: &'a str, open: Tag<'a>) -> Element<'a> {
    let start = open.start;
    if open.self_closing || VOID_TAGS.contains(&open.name.as_str()) {
        return Element {
            tag: open.name,
            open_tag: open.raw,
            inner: "",
            inner_start: open.end,
            start,
            end: open.end,
        };
    }

    if RAW_TEXT_TAGS.contains(&open.name.as_str()) {
        let close = find_ci(s, &format!("</{}", open.name), open.end);
        let (inner_end, end) = match close {
            Some(c) => (c, s[c..].find('>').map(|g| c + g + 1).unwrap_or(s.len())),
            None => (s.len(), s.len()),
        };
        return Element {
            tag: open.name,
            open_tag: open.raw,
            inner: &s[open.end..inner_end],
            inner_start: open.end,
            start,
            end,
        };
    }

    let mut depth = 1usize;
    let mut tags = Tags::new(s);
    tags.pos = open.end;
    for t in tags {
        if t.name != open.name || t.self_closing {
            continue;
        }
        if t.closing {
            depth -= 1;
            if depth == 0 {
                return Element {
                    tag: open.name,
                    open_tag: open.raw,
                    inner: &s[open.end..t.start],
                    inner_start: open.end,
                    start,
                    end: t.end,
                };
            }
        } else {
            depth += 1;
        }
    }

    // Unclosed: runs to the end of the input.
    Element {
        tag: open.name,
        open_tag: open.raw,
        inner: &s[open.end..],
        inner_start: open.end,
        start,
        end: s.len(),
    }
}

struct Tags<'a> {
    s: &'a str,
    pos: usize,
    raw_text_of: Option<String>,
}

impl<'a> Tags<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            s,
            pos: 0,
            raw_text_of: None,
        }
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        if let Some(name) = self.raw_text_of.take() {
            self.pos = find_ci(self.s, &format!("</{name}"), self.pos).unwrap_or(self.s.len());
        }

        let b = self.s.as_bytes();
        while self.pos < b.len() {
            let lt = self.s[self.pos..].find('<')? + self.pos;
            let rest = &self.s[lt..];

            if rest.starts_with("<!--") {
                self.pos = rest.find("-->").map(|e| lt + e + 3).unwrap_or(b.len());
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = rest.find('>').map(|e| lt + e + 1).unwrap_or(b.len());
                continue;
            }

            let closing = rest.starts_with("</");
            let name_start = lt + if closing { 2 } else { 1 };
            let name_len = self.s[name_start..]
                .bytes()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == b'-' || *c == b':')
                .count();
            if name_len == 0 || !b[name_start].is_ascii_alphabetic() {
                self.pos = lt + 1;
                continue;
            }

            let end = tag_end(b, name_start + name_len);
            let raw = &self.s[lt..end];
            let name = self.s[name_start..name_start + name_len].to_ascii_lowercase();
            let self_closing = !closing && raw.ends_with("/>");
            self.pos = end;

            if !closing && !self_closing && RAW_TEXT_TAGS.contains(&name.as_str()) {
                self.raw_text_of = Some(name.clone());
            }

            return Some(Tag {
                start: lt,
                end,
                name,
                closing,
                self_closing,
                raw,
            });
        }
        None
    }
}

/// Offset just past the `>` that ends a tag, skipping quoted attribute values.
fn tag_end(b: &[u8], mut i: usize) -> usize {
    let mut quote: Option<u8> = None;
    while i < b.len() {
        match (quote, b[i]) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b[i]),
            (None, b'>') => return i + 1,
            _ => {}
        }
        i += 1;
    }
    b.len()
}

fn find_ci(s: &str, pat: &str, from: usize) -> Option<usize> {
    let hay = s.as_bytes();
    let pat = pat.as_bytes();
    if pat.is_empty() || from >= hay.len() {
        return None;
    }
    hay[from..]
        .windows(pat.len())
        .position(|w| w.eq_ignore_ascii_case(pat))
        .map(|p| p + from)
}

fn tag_attr(raw: &str, name: &str) -> Option<String> {
    parse_attrs(raw)
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.map(|v| decode_entities(&v)).unwrap_or_default())
}

/// Attribute names and raw values of an opening tag such as `<td class="x" hidden>`.
fn parse_attrs(raw: &str) -> Vec<(String, Option<String>)> {
    let b = raw.as_bytes();
    let mut out = Vec::new();

    let mut i = 1;
    while i < b.len() && !b[i].is_ascii_whitespace() && b[i] != b'>' && b[i] != b'/' {
        i += 1;
    }

    loop {
        while i < b.len() && (b[i].is_ascii_whitespace() || b[i] == b'/') {
            i += 1;
        }
        if i >= b.len() || b[i] == b'>' {
            break;
        }

        let name_start = i;
        while i < b.len() && !b[i].is_ascii_whitespace() && !matches!(b[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        let name = raw[name_start..i].to_ascii_lowercase();

        while i < b.len() && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < b.len() && b[i] == b'=' {
            i += 1;
            while i < b.len() && b[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if i < b.len() && (b[i] == b'"' || b[i] == b'\'') {
                let q = b[i];
                let vs = i + 1;
                let ve = raw[vs..].bytes().position(|c| c == q).map(|p| vs + p).unwrap_or(b.len());
                i = (ve + 1).min(b.len());
                raw[vs..ve].to_string()
            } else {
                let vs = i;
                while i < b.len() && !b[i].is_ascii_whitespace() && b[i] != b'>' {
                    i += 1;
                }
                raw[vs..i].to_string()
            };
            out.push((name, Some(value)));
        } else if !name.is_empty() {
            out.push((name, None));
        }
    }

    out
}

/// Strip tags (and script/style bodies), decode entities and collapse whitespace.
pub fn visible_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pos = 0;
    let mut tags = Tags::new(s);
    while let Some(t) = tags.next() {
        out.push_str(&s[pos..t.start]);
        pos = t.end;
        if let Some(name) = tags.raw_text_of.as_deref() {
            pos = find_ci(s, &format!("</{name}"), pos).unwrap_or(s.len());
        }
    }
    if pos < s.len() {
        out.push_str(&s[pos..]);
    }
    normalize_ws(&decode_entities(&out))
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';').filter(|p| *p <= 10) else {
            out.push('&');
            rest = after;
            continue;
        };
        let entity = &after[..semi];
        let decoded = match entity {
            "nbsp" => Some('\u{a0}'),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapse runs of whitespace (non-breaking spaces included) into one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
