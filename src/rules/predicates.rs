// src/rules/predicates.rs
// =============================================================================
// The automated checks, registered by rule id.
//
// Each function here answers one catalogue rule. They are heuristics over
// raw HTML: they see what the server sent, not what scripts render later.
//
// REGISTRY maps rule ids to checks. The catalogue loader refuses to start if
// an automated rule has no entry here, or an entry has no rule.
// =============================================================================

use scraper::{ElementRef, Html};
use std::collections::HashSet;

use super::check::{
    attr_value, root_of, select_all, select_within, text_of, Check, CheckError, Outcome,
    PageContext,
};

pub static REGISTRY: &[(&str, Check)] = &[
    ("1", Check::Document(html_lang_is_arabic)),
    ("2", Check::Document(arabic_page_is_rtl)),
    ("3", Check::Document(has_language_switcher)),
    ("4", Check::Document(has_title)),
    ("5", Check::Document(has_responsive_viewport)),
    ("6", Check::Document(declares_utf8)),
    ("7", Check::Document(has_header)),
    ("8", Check::Document(header_has_logo)),
    ("9", Check::Elements { selector: "header img, [role=\"banner\"] img", predicate: image_has_text_alternative }),
    ("10", Check::Document(has_navigation)),
    ("11", Check::Elements { selector: "nav, [role=\"navigation\"]", predicate: navigation_uses_lists }),
    ("12", Check::Elements { selector: "nav[aria-label=\"breadcrumb\"], nav[aria-label=\"Breadcrumb\"], .breadcrumb", predicate: breadcrumb_is_list }),
    ("13", Check::Document(has_skip_link)),
    ("14", Check::Document(has_search_bar)),
    ("15", Check::Elements { selector: "input[type=\"search\"]", predicate: field_is_labelled }),
    ("16", Check::Document(has_footer)),
    ("17", Check::Document(footer_has_copyright)),
    ("18", Check::Document(footer_links_privacy)),
    ("19", Check::Document(footer_links_terms)),
    ("20", Check::Document(footer_links_contact)),
    ("21", Check::Document(footer_links_accessibility)),
    ("22", Check::Elements { selector: "img", predicate: image_has_alt }),
    ("23", Check::Elements { selector: "svg[role=\"img\"]", predicate: svg_has_name }),
    ("24", Check::Elements { selector: "video", predicate: video_has_captions }),
    ("25", Check::Elements { selector: "video[autoplay], audio[autoplay]", predicate: autoplay_is_muted }),
    ("26", Check::Elements { selector: "iframe", predicate: frame_has_title }),
    ("27", Check::Elements { selector: FORM_FIELDS, predicate: field_is_labelled }),
    ("28", Check::Elements { selector: "input[type=\"email\"], input[type=\"tel\"]", predicate: field_has_autocomplete }),
    ("29", Check::Elements { selector: "input[type=\"file\"]", predicate: upload_declares_accept }),
    ("30", Check::Elements { selector: "button", predicate: button_has_name }),
    ("31", Check::Elements { selector: "form", predicate: form_has_submit }),
    ("32", Check::Elements { selector: "a[href]", predicate: link_has_text }),
    ("33", Check::Elements { selector: "a[href]", predicate: link_text_is_descriptive }),
    ("34", Check::Elements { selector: "a[target=\"_blank\"]", predicate: new_tab_link_is_safe }),
    ("35", Check::Document(has_single_h1)),
    ("36", Check::Document(headings_are_sequential)),
    ("37", Check::Document(has_main)),
    ("38", Check::Document(ids_are_unique)),
    ("39", Check::Elements { selector: "table", predicate: table_has_headers }),
    ("40", Check::Elements { selector: "ul, ol", predicate: list_has_only_items }),
    ("41", Check::Elements { selector: "[tabindex]", predicate: tabindex_not_positive }),
    ("42", Check::Elements { selector: "[role]", predicate: role_is_valid }),
    ("43", Check::Document(zoom_is_allowed)),
    ("44", Check::Document(no_deprecated_elements)),
    ("45", Check::Document(has_favicon)),
    ("46", Check::Document(has_meta_description)),
    ("47", Check::Document(served_over_https)),
];

const FORM_FIELDS: &str = "input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"]):not([type=\"reset\"]):not([type=\"image\"]), select, textarea";

const HEADER: &str = "header, [role=\"banner\"]";
const NAVIGATION: &str = "nav, [role=\"navigation\"]";
const FOOTER: &str = "footer, [role=\"contentinfo\"]";
const MAIN: &str = "main, [role=\"main\"]";

const GENERIC_LINK_TEXT: &[&str] = &[
    "click here", "here", "read more", "more", "link",
    "اضغط هنا", "انقر هنا", "هنا", "المزيد", "اقرأ المزيد", "رابط",
];

const DEPRECATED_ELEMENTS: &[&str] = &["font", "center", "marquee", "blink", "big", "strike", "tt"];

// WAI-ARIA 1.2 roles (abstract roles excluded)
const VALID_ROLES: &[&str] = &[
    "alert", "alertdialog", "application", "article", "banner", "blockquote", "button",
    "caption", "cell", "checkbox", "code", "columnheader", "combobox", "complementary",
    "contentinfo", "definition", "deletion", "dialog", "directory", "document", "emphasis",
    "feed", "figure", "form", "generic", "grid", "gridcell", "group", "heading", "img",
    "insertion", "link", "list", "listbox", "listitem", "log", "main", "marquee", "math",
    "menu", "menubar", "menuitem", "menuitemcheckbox", "menuitemradio", "meter",
    "navigation", "none", "note", "option", "paragraph", "presentation", "progressbar",
    "radio", "radiogroup", "region", "row", "rowgroup", "rowheader", "scrollbar", "search",
    "searchbox", "separator", "slider", "spinbutton", "status", "strong", "subscript",
    "superscript", "switch", "tab", "table", "tablist", "tabpanel", "term", "textbox",
    "time", "timer", "toolbar", "tooltip", "tree", "treegrid", "treeitem",
];

// ---- shared helpers ---------------------------------------------------------

fn exists(doc: &Html, css: &str) -> Result<bool, CheckError> {
    Ok(!select_all(doc, css)?.is_empty())
}

fn html_lang(doc: &Html) -> Option<String> {
    attr_value(doc.root_element(), "lang").map(str::to_ascii_lowercase)
}

fn is_arabic(lang: &str) -> bool {
    lang == "ar" || lang.starts_with("ar-")
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle))
}

// aria-label, aria-labelledby or title
fn has_aria_name(element: ElementRef<'_>) -> bool {
    ["aria-label", "aria-labelledby", "title"]
        .iter()
        .any(|name| attr_value(element, name).is_some())
}

// Looks for a link in the footer whose text or href mentions one of the keywords
fn footer_link(doc: &Html, keywords: &[&str], what: &str) -> Result<Outcome, CheckError> {
    let footers = select_all(doc, FOOTER)?;
    if footers.is_empty() {
        return Ok(Outcome::fail(
            "No footer landmark found",
            format!("Add a <footer> containing a link to the {what}"),
        ));
    }

    for footer in footers {
        for link in select_within(footer, "a[href]")? {
            let href = link.value().attr("href").unwrap_or_default();
            if contains_any(&text_of(link), keywords) || contains_any(href, keywords) {
                return Ok(Outcome::pass());
            }
        }
    }

    Ok(Outcome::fail(
        format!("Footer has no link to the {what}"),
        format!("Link the {what} from the footer"),
    ))
}

// ---- language ---------------------------------------------------------------

fn html_lang_is_arabic(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(match html_lang(doc) {
        Some(lang) if is_arabic(&lang) => Outcome::pass(),
        Some(lang) => Outcome::fail(
            format!("The html element declares lang=\"{lang}\""),
            "Set lang=\"ar\" on the html element of Arabic pages",
        ),
        None => Outcome::fail(
            "The html element has no lang attribute",
            "Add lang=\"ar\" to the html element",
        ),
    })
}

fn arabic_page_is_rtl(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    if !html_lang(doc).is_some_and(|lang| is_arabic(&lang)) {
        return Ok(Outcome::pass());
    }

    let rtl = |element: ElementRef<'_>| {
        attr_value(element, "dir").is_some_and(|dir| dir.eq_ignore_ascii_case("rtl"))
    };
    let body_rtl = select_all(doc, "body")?.into_iter().any(rtl);

    Ok(Outcome::require(
        rtl(doc.root_element()) || body_rtl,
        "Arabic page without dir=\"rtl\"",
        "Add dir=\"rtl\" to the html element",
    ))
}

fn has_language_switcher(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    if exists(doc, "a[hreflang], a[lang=\"en\"]")? {
        return Ok(Outcome::pass());
    }

    for link in select_all(doc, "a[href]")? {
        let text = text_of(link).to_lowercase();
        let href = link.value().attr("href").unwrap_or_default().to_lowercase();
        if text == "english" || text == "en"
            || href.contains("/en/") || href.ends_with("/en") || href.contains("lang=en")
        {
            return Ok(Outcome::pass());
        }
    }

    Ok(Outcome::fail(
        "No link to an English version of the page",
        "Add a language switcher linking to the English page (with hreflang=\"en\")",
    ))
}

// ---- document head ----------------------------------------------------------

fn has_title(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let titled = select_all(doc, "title")?
        .into_iter()
        .any(|title| !text_of(title).is_empty());
    Ok(Outcome::require(titled, "Missing or empty <title>", "Give every page a descriptive <title>"))
}

fn viewport_content(doc: &Html) -> Result<Option<String>, CheckError> {
    Ok(select_all(doc, "meta[name=\"viewport\"]")?
        .into_iter()
        .find_map(|meta| attr_value(meta, "content"))
        .map(|content| content.to_ascii_lowercase().replace(' ', "")))
}

fn has_responsive_viewport(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let responsive = viewport_content(doc)?.is_some_and(|c| c.contains("width=device-width"));
    Ok(Outcome::require(
        responsive,
        "No responsive viewport meta tag",
        "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
    ))
}

fn declares_utf8(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let utf8 = select_all(doc, "meta")?.into_iter().any(|meta| {
        let charset = attr_value(meta, "charset").is_some_and(|c| c.eq_ignore_ascii_case("utf-8"));
        let http_equiv = attr_value(meta, "content")
            .is_some_and(|c| c.to_ascii_lowercase().replace(' ', "").contains("charset=utf-8"));
        charset || http_equiv
    });
    Ok(Outcome::require(utf8, "No UTF-8 charset declaration", "Add <meta charset=\"utf-8\">"))
}

fn zoom_is_allowed(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let Some(content) = viewport_content(doc)? else {
        return Ok(Outcome::pass());
    };

    let mut blocked = false;
    for directive in content.split([',', ';']) {
        match directive.split_once('=') {
            Some(("user-scalable", value)) => blocked |= value == "no" || value == "0",
            Some(("maximum-scale", value)) => {
                blocked |= value.parse::<f32>().is_ok_and(|scale| scale < 2.0)
            }
            _ => {}
        }
    }

    Ok(Outcome::require(
        !blocked,
        "Viewport disables or limits zoom",
        "Remove user-scalable=no and any maximum-scale below 2",
    ))
}

fn has_favicon(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        exists(doc, "link[rel~=\"icon\"]")?,
        "No favicon declared",
        "Add <link rel=\"icon\" href=\"...\">",
    ))
}

fn has_meta_description(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let described = select_all(doc, "meta[name=\"description\"]")?
        .into_iter()
        .any(|meta| attr_value(meta, "content").is_some());
    Ok(Outcome::require(
        described,
        "No meta description",
        "Add <meta name=\"description\" content=\"...\">",
    ))
}

fn served_over_https(_: &Html, ctx: &PageContext) -> Result<Outcome, CheckError> {
    // Without a URL (raw markup) there is nothing to verify
    Ok(match &ctx.page_url {
        Some(url) if url.scheme() != "https" => Outcome::fail(
            format!("Page is served over {}", url.scheme()),
            "Serve the page over HTTPS and redirect HTTP to it",
        ),
        _ => Outcome::pass(),
    })
}

// ---- landmarks --------------------------------------------------------------

fn has_header(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        exists(doc, HEADER)?,
        "No header landmark found",
        "Wrap the platform header in <header>",
    ))
}

fn header_has_logo(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let headers = select_all(doc, HEADER)?;
    if headers.is_empty() {
        return Ok(Outcome::fail("No header landmark found", "Add a <header> with the entity logo"));
    }
    for header in headers {
        if !select_within(header, "img, svg")?.is_empty() {
            return Ok(Outcome::pass());
        }
    }
    Ok(Outcome::fail("Header contains no logo image", "Place the entity logo inside the header"))
}

fn has_navigation(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        exists(doc, NAVIGATION)?,
        "No navigation landmark found",
        "Wrap the main menu in <nav>",
    ))
}

fn has_search_bar(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let found = exists(
        doc,
        "input[type=\"search\"], [role=\"search\"], form[action*=\"search\"], input[name=\"q\"], input[name*=\"search\"]",
    )?;
    Ok(Outcome::require(found, "No search bar found", "Add a search form with role=\"search\""))
}

fn has_footer(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        exists(doc, FOOTER)?,
        "No footer landmark found",
        "Wrap the platform footer in <footer>",
    ))
}

fn has_main(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        exists(doc, MAIN)?,
        "No main landmark found",
        "Wrap the page content in <main>",
    ))
}

fn has_skip_link(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let found = select_all(doc, "a[href^=\"#\"]")?.into_iter().any(|link| {
        contains_any(&text_of(link), &["skip", "تخطي", "انتقل إلى المحتوى"])
            || attr_value(link, "class").is_some_and(|class| class.contains("skip"))
    });
    Ok(Outcome::require(
        found,
        "No skip-to-content link",
        "Add a first focusable link that jumps to the main content",
    ))
}

// ---- footer -----------------------------------------------------------------

fn footer_has_copyright(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let footers = select_all(doc, FOOTER)?;
    if footers.is_empty() {
        return Ok(Outcome::fail("No footer landmark found", "Add a <footer> with a copyright notice"));
    }
    let found = footers
        .into_iter()
        .any(|footer| contains_any(&text_of(footer), &["©", "copyright", "جميع الحقوق"]));
    Ok(Outcome::require(found, "Footer has no copyright notice", "Add the copyright statement to the footer"))
}

fn footer_links_privacy(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    footer_link(doc, &["privacy", "الخصوصية"], "privacy policy")
}

fn footer_links_terms(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    footer_link(doc, &["terms", "conditions", "الشروط", "شروط الاستخدام"], "terms of use")
}

fn footer_links_contact(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    footer_link(doc, &["contact", "تواصل", "اتصل"], "contact page")
}

fn footer_links_accessibility(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    footer_link(doc, &["accessibility", "إمكانية الوصول", "سهولة الوصول"], "accessibility statement")
}

// ---- structure --------------------------------------------------------------

fn has_single_h1(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(match select_all(doc, "h1")?.len() {
        1 => Outcome::pass(),
        0 => Outcome::fail("Page has no h1", "Add one h1 with the page title"),
        n => Outcome::fail(format!("Page has {n} h1 elements"), "Keep one h1 and demote the others"),
    })
}

fn headings_are_sequential(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let mut previous: Option<u8> = None;
    for heading in select_all(doc, "h1, h2, h3, h4, h5, h6")? {
        let level = heading.value().name().as_bytes()[1] - b'0';
        if let Some(prev) = previous {
            if level > prev + 1 {
                return Ok(Outcome::fail(
                    format!("h{prev} is followed by h{level}"),
                    "Do not skip heading levels",
                ));
            }
        }
        previous = Some(level);
    }
    Ok(Outcome::pass())
}

fn ids_are_unique(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    let mut seen = HashSet::new();
    for element in select_all(doc, "[id]")? {
        if let Some(id) = element.value().id() {
            if !seen.insert(id) {
                return Ok(Outcome::fail(format!("Duplicate id \"{id}\""), "Give every element a unique id"));
            }
        }
    }
    Ok(Outcome::pass())
}

fn no_deprecated_elements(doc: &Html, _: &PageContext) -> Result<Outcome, CheckError> {
    for name in DEPRECATED_ELEMENTS {
        if exists(doc, name)? {
            return Ok(Outcome::fail(
                format!("Deprecated <{name}> element in use"),
                "Replace presentational elements with CSS",
            ));
        }
    }
    Ok(Outcome::pass())
}

fn navigation_uses_lists(nav: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    // A nav with a single link (e.g. a back link) doesn't need a list
    if select_within(nav, "a")?.len() < 2 {
        return Ok(Outcome::pass());
    }
    Ok(Outcome::require(
        !select_within(nav, "ul, ol, [role=\"menubar\"], [role=\"menu\"], [role=\"list\"]")?.is_empty(),
        "Navigation links are not in a list",
        "Put navigation links in a <ul> of <li> items",
    ))
}

fn breadcrumb_is_list(breadcrumb: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let is_list = breadcrumb.value().name() == "ol" || !select_within(breadcrumb, "ol")?.is_empty();
    Ok(Outcome::require(
        is_list,
        "Breadcrumb is not an ordered list",
        "Mark breadcrumbs up as <nav aria-label=\"breadcrumb\"><ol>...</ol></nav>",
    ))
}

fn table_has_headers(table: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    if attr_value(table, "role").is_some_and(|role| role == "presentation" || role == "none") {
        return Ok(Outcome::pass());
    }
    Ok(Outcome::require(
        !select_within(table, "th")?.is_empty(),
        "Table has no header cells",
        "Use <th> for row or column headers",
    ))
}

fn list_has_only_items(list: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let stray = list
        .children()
        .filter_map(ElementRef::wrap)
        .map(|child| child.value().name())
        .find(|name| !matches!(*name, "li" | "script" | "template"));
    Ok(match stray {
        Some(name) => Outcome::fail(
            format!("<{name}> is a direct child of a list"),
            "Only <li> elements may be direct children of <ul>/<ol>",
        ),
        None => Outcome::pass(),
    })
}

// ---- images and media -------------------------------------------------------

fn image_has_alt(img: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    // alt="" is fine: it marks the image as decorative
    Ok(Outcome::require(
        img.value().attr("alt").is_some(),
        "Image has no alt attribute",
        "Add alt text, or alt=\"\" for decorative images",
    ))
}

fn image_has_text_alternative(img: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        attr_value(img, "alt").is_some() || has_aria_name(img),
        "Header image has no text alternative",
        "Give the logo alt text naming the entity",
    ))
}

fn svg_has_name(svg: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let titled = select_within(svg, "title")?
        .into_iter()
        .any(|title| !text_of(title).is_empty());
    Ok(Outcome::require(
        titled || has_aria_name(svg),
        "SVG with role=\"img\" has no accessible name",
        "Add aria-label or a <title> child",
    ))
}

fn video_has_captions(video: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        !select_within(video, "track[kind=\"captions\"], track[kind=\"subtitles\"]")?.is_empty(),
        "Video has no captions track",
        "Add <track kind=\"captions\" srclang=\"ar\" src=\"...\">",
    ))
}

fn autoplay_is_muted(media: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        media.value().attr("muted").is_some(),
        "Media autoplays with sound",
        "Remove autoplay or add muted",
    ))
}

fn frame_has_title(frame: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        has_aria_name(frame),
        "Frame has no title",
        "Add a title describing the embedded content",
    ))
}

// ---- forms ------------------------------------------------------------------

fn field_is_labelled(field: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    if has_aria_name(field) {
        return Ok(Outcome::pass());
    }

    let wrapped = field
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "label");
    if wrapped {
        return Ok(Outcome::pass());
    }

    if let Some(id) = attr_value(field, "id") {
        let labelled = select_within(root_of(field), "label[for]")?
            .into_iter()
            .any(|label| label.value().attr("for") == Some(id));
        if labelled {
            return Ok(Outcome::pass());
        }
    }

    Ok(Outcome::fail(
        "Form field has no label",
        "Associate a <label for=\"...\"> or add aria-label",
    ))
}

fn field_has_autocomplete(field: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        attr_value(field, "autocomplete").is_some(),
        "Personal data field has no autocomplete attribute",
        "Add autocomplete=\"email\" or autocomplete=\"tel\"",
    ))
}

fn upload_declares_accept(field: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    Ok(Outcome::require(
        attr_value(field, "accept").is_some(),
        "File upload does not restrict accepted types",
        "Add accept=\".pdf,.jpg,...\" and state the limits next to the field",
    ))
}

fn button_has_name(button: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let image_alt = select_within(button, "img[alt]")?
        .into_iter()
        .any(|img| attr_value(img, "alt").is_some());
    Ok(Outcome::require(
        !text_of(button).is_empty() || has_aria_name(button) || image_alt,
        "Button has no accessible name",
        "Add visible text or aria-label to the button",
    ))
}

fn form_has_submit(form: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let submit = select_within(
        form,
        "button:not([type=\"button\"]):not([type=\"reset\"]), input[type=\"submit\"], input[type=\"image\"]",
    )?;
    Ok(Outcome::require(!submit.is_empty(), "Form has no submit control", "Add a submit button"))
}

// ---- links ------------------------------------------------------------------

fn link_has_text(link: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let image_alt = select_within(link, "img")?
        .into_iter()
        .any(|img| attr_value(img, "alt").is_some());
    Ok(Outcome::require(
        !text_of(link).is_empty() || has_aria_name(link) || image_alt,
        "Link has no discernible text",
        "Add link text, aria-label, or alt text on the linked image",
    ))
}

fn link_text_is_descriptive(link: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    if attr_value(link, "aria-label").is_some() {
        return Ok(Outcome::pass());
    }
    let text = text_of(link).to_lowercase();
    Ok(Outcome::require(
        !GENERIC_LINK_TEXT.contains(&text.as_str()),
        format!("Generic link text \"{text}\""),
        "Describe the link destination in the link text",
    ))
}

fn new_tab_link_is_safe(link: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let safe = attr_value(link, "rel").is_some_and(|rel| {
        rel.split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("noopener") || token.eq_ignore_ascii_case("noreferrer"))
    });
    Ok(Outcome::require(safe, "target=\"_blank\" without rel=\"noopener\"", "Add rel=\"noopener noreferrer\""))
}

// ---- accessibility attributes -----------------------------------------------

fn tabindex_not_positive(element: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let raw = element.value().attr("tabindex").unwrap_or_default().trim();
    let value: i32 = raw.parse().map_err(|_| CheckError::InvalidAttribute {
        attribute: "tabindex".to_string(),
        value: raw.to_string(),
    })?;
    Ok(Outcome::require(
        value <= 0,
        format!("tabindex=\"{value}\" overrides the natural focus order"),
        "Use tabindex=\"0\" or \"-1\" and fix the DOM order instead",
    ))
}

fn role_is_valid(element: ElementRef<'_>, _: &PageContext) -> Result<Outcome, CheckError> {
    let Some(role) = attr_value(element, "role") else {
        return Ok(Outcome::fail("Empty role attribute", "Remove the role or give it a valid value"));
    };
    // Fallback roles are allowed; the first token is the one browsers use
    let primary = role.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    Ok(Outcome::require(
        VALID_ROLES.contains(&primary.as_str()),
        format!("Unknown ARIA role \"{primary}\""),
        "Use a role defined by WAI-ARIA",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_check(id: &str) -> crate::rules::check::DocumentPredicate {
        match REGISTRY.iter().find(|(rule, _)| *rule == id) {
            Some((_, Check::Document(predicate))) => *predicate,
            _ => panic!("rule {id} is not a document check"),
        }
    }

    fn run_document(id: &str, html: &str) -> Outcome {
        let doc = Html::parse_document(html);
        document_check(id)(&doc, &PageContext::default()).unwrap()
    }

    // Runs an element rule the way the engine does: any failing match fails
    fn run_elements(id: &str, html: &str) -> Result<bool, CheckError> {
        let Some((_, Check::Elements { selector, predicate })) =
            REGISTRY.iter().find(|(rule, _)| *rule == id)
        else {
            panic!("rule {id} is not an element check");
        };
        let doc = Html::parse_document(html);
        for element in select_all(&doc, selector)? {
            if !predicate(element, &PageContext::default())?.passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[test]
    fn test_registry_ids_are_unique() {
        let mut seen = HashSet::new();
        assert!(REGISTRY.iter().all(|(id, _)| seen.insert(*id)));
    }

    #[test]
    fn test_every_selector_parses() {
        for (id, check) in REGISTRY {
            if let Check::Elements { selector, .. } = check {
                assert!(crate::rules::check::parse_selector(selector).is_ok(), "rule {id}");
            }
        }
    }

    #[test]
    fn test_arabic_language() {
        assert!(run_document("1", r#"<html lang="ar"></html>"#).passed);
        assert!(run_document("1", r#"<html lang="ar-SA"></html>"#).passed);
        assert!(!run_document("1", r#"<html lang="en"></html>"#).passed);
        assert!(!run_document("1", "<html></html>").passed);
    }

    #[test]
    fn test_rtl_only_required_for_arabic() {
        assert!(run_document("2", r#"<html lang="en"></html>"#).passed);
        assert!(!run_document("2", r#"<html lang="ar"></html>"#).passed);
        assert!(run_document("2", r#"<html lang="ar" dir="rtl"></html>"#).passed);
        assert!(run_document("2", r#"<html lang="ar"><body dir="RTL"></body></html>"#).passed);
    }

    #[test]
    fn test_zoom() {
        let page = |content: &str| format!(r#"<head><meta name="viewport" content="{content}"></head>"#);
        assert!(run_document("43", &page("width=device-width, initial-scale=1")).passed);
        assert!(!run_document("43", &page("width=device-width, user-scalable=no")).passed);
        assert!(!run_document("43", &page("width=device-width, maximum-scale=1.0")).passed);
        assert!(run_document("43", &page("width=device-width, maximum-scale=5")).passed);
    }

    #[test]
    fn test_heading_order() {
        assert!(run_document("36", "<h1>a</h1><h2>b</h2><h3>c</h3><h2>d</h2>").passed);
        let skipped = run_document("36", "<h1>a</h1><h3>b</h3>");
        assert!(!skipped.passed);
        assert_eq!(skipped.reason.as_deref(), Some("h1 is followed by h3"));
    }

    #[test]
    fn test_duplicate_ids() {
        assert!(run_document("38", r#"<div id="a"></div><div id="b"></div>"#).passed);
        assert!(!run_document("38", r#"<div id="a"></div><span id="a"></span>"#).passed);
    }

    #[test]
    fn test_footer_links() {
        let footer = r#"<footer>© 2024 <a href="/ar/privacy">سياسة الخصوصية</a><a href="/contact-us">تواصل معنا</a></footer>"#;
        assert!(run_document("17", footer).passed);
        assert!(run_document("18", footer).passed);
        assert!(!run_document("19", footer).passed);
        assert!(run_document("20", footer).passed);
        assert_eq!(
            run_document("18", "<div></div>").reason.as_deref(),
            Some("No footer landmark found")
        );
    }

    #[test]
    fn test_https_uses_page_url() {
        let doc = Html::parse_document("<p></p>");
        let check = document_check("47");
        let ctx = |url: &str| PageContext {
            page_url: Some(url::Url::parse(url).unwrap()),
        };
        assert!(check(&doc, &ctx("https://my.gov.sa/")).unwrap().passed);
        assert!(!check(&doc, &ctx("http://my.gov.sa/")).unwrap().passed);
        assert!(check(&doc, &PageContext::default()).unwrap().passed);
    }

    #[test]
    fn test_form_labels() {
        assert!(run_elements("27", r#"<label for="n">Name</label><input id="n">"#).unwrap());
        assert!(run_elements("27", r#"<label>Name <input></label>"#).unwrap());
        assert!(run_elements("27", r#"<input aria-label="Name">"#).unwrap());
        assert!(run_elements("27", r#"<input type="hidden" name="csrf">"#).unwrap());
        assert!(!run_elements("27", r#"<input id="n" placeholder="Name">"#).unwrap());
        assert!(!run_elements("27", r#"<select></select>"#).unwrap());
    }

    #[test]
    fn test_links() {
        assert!(run_elements("32", r#"<a href="/x">الخدمات</a>"#).unwrap());
        assert!(run_elements("32", r#"<a href="/"><img src="l.png" alt="الرئيسية"></a>"#).unwrap());
        assert!(!run_elements("32", r#"<a href="/x"><i class="icon"></i></a>"#).unwrap());
        assert!(!run_elements("33", r#"<a href="/x">اضغط هنا</a>"#).unwrap());
        assert!(!run_elements("33", r#"<a href="/x">Read more</a>"#).unwrap());
        assert!(run_elements("33", r#"<a href="/x" aria-label="Read more about permits">Read more</a>"#).unwrap());
        assert!(!run_elements("34", r#"<a href="https://x.com" target="_blank">X</a>"#).unwrap());
        assert!(run_elements("34", r#"<a href="https://x.com" target="_blank" rel="noopener">X</a>"#).unwrap());
    }

    #[test]
    fn test_tabindex() {
        assert!(run_elements("41", r#"<div tabindex="0"></div><div tabindex="-1"></div>"#).unwrap());
        assert!(!run_elements("41", r#"<div tabindex="3"></div>"#).unwrap());
        assert!(matches!(
            run_elements("41", r#"<div tabindex="first"></div>"#),
            Err(CheckError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_lists_and_roles() {
        assert!(run_elements("40", "<ul><li>a</li><li>b</li></ul>").unwrap());
        assert!(!run_elements("40", "<ul><li>a</li><div>b</div></ul>").unwrap());
        assert!(run_elements("42", r#"<div role="navigation"></div><div role="switch button"></div>"#).unwrap());
        assert!(!run_elements("42", r#"<div role="sidebar"></div>"#).unwrap());
    }

    #[test]
    fn test_media() {
        assert!(!run_elements("24", r#"<video src="a.mp4"></video>"#).unwrap());
        assert!(run_elements("24", r#"<video src="a.mp4"><track kind="captions" src="a.vtt"></video>"#).unwrap());
        assert!(!run_elements("25", r#"<video autoplay></video>"#).unwrap());
        assert!(run_elements("25", r#"<video autoplay muted></video>"#).unwrap());
        assert!(!run_elements("29", r#"<input type="file">"#).unwrap());
        assert!(run_elements("29", r#"<input type="file" accept=".pdf">"#).unwrap());
    }

    #[test]
    fn test_language_switcher() {
        assert!(run_document("3", r#"<a href="/en/" hreflang="en">English</a>"#).passed);
        assert!(run_document("3", r#"<a href="/services?lang=en">EN</a>"#).passed);
        assert!(!run_document("3", r#"<a href="/about">عن المنصة</a>"#).passed);
    }

    #[test]
    fn test_header_logo() {
        assert!(run_document("8", r#"<header><img src="logo.svg" alt="الشعار"></header>"#).passed);
        assert!(run_document("8", r#"<div role="banner"><img src="logo.png" alt="الجهة"></div>"#).passed);
        assert!(!run_document("8", "<header><p>المنصة</p></header>").passed);
        assert_eq!(
            run_document("8", "<div></div>").reason.as_deref(),
            Some("No header landmark found")
        );
    }

    #[test]
    fn test_header_image_alternative() {
        assert!(run_elements("9", r#"<header><img src="logo.png" alt="الجهة"></header>"#).unwrap());
        assert!(run_elements("9", r#"<header><img src="logo.png" aria-label="الجهة"></header>"#).unwrap());
        assert!(!run_elements("9", r#"<header><img src="logo.png"></header>"#).unwrap());
        assert!(!run_elements("9", r#"<header><img src="logo.png" alt=" "></header>"#).unwrap());
    }

    #[test]
    fn test_navigation_lists() {
        assert!(run_elements(
            "11",
            r#"<nav><ul><li><a href="/">أ</a></li><li><a href="/b">ب</a></li></ul></nav>"#
        )
        .unwrap());
        assert!(run_elements("11", r#"<nav><a href="/">رجوع</a></nav>"#).unwrap());
        assert!(!run_elements("11", r#"<nav><a href="/">أ</a><a href="/b">ب</a></nav>"#).unwrap());
    }

    #[test]
    fn test_breadcrumb_list() {
        assert!(run_elements(
            "12",
            r#"<nav aria-label="breadcrumb"><ol><li><a href="/">الرئيسية</a></li><li>الخدمات</li></ol></nav>"#
        )
        .unwrap());
        assert!(!run_elements(
            "12",
            r#"<nav aria-label="breadcrumb"><a href="/">الرئيسية</a> / <span>الخدمات</span></nav>"#
        )
        .unwrap());
    }

    #[test]
    fn test_skip_link() {
        assert!(run_document("13", r##"<a href="#content">تخطي إلى المحتوى</a>"##).passed);
        assert!(run_document("13", r##"<a class="skip-link" href="#main">المحتوى</a>"##).passed);
        assert!(!run_document("13", r#"<a href="/content">Skip</a>"#).passed);
        assert!(!run_document("13", "<p></p>").passed);
    }

    #[test]
    fn test_search_label() {
        assert!(run_elements("15", r#"<input type="search" aria-label="بحث">"#).unwrap());
        assert!(run_elements("15", r#"<label>بحث <input type="search"></label>"#).unwrap());
        assert!(!run_elements("15", r#"<input type="search" name="q">"#).unwrap());
    }

    #[test]
    fn test_svg_name() {
        assert!(run_elements("23", r#"<svg role="img" aria-label="الشعار"></svg>"#).unwrap());
        assert!(!run_elements("23", r#"<svg role="img"><path d="M0 0"></path></svg>"#).unwrap());
    }

    #[test]
    fn test_frame_title() {
        assert!(run_elements("26", r#"<iframe src="/map" title="الخريطة"></iframe>"#).unwrap());
        assert!(!run_elements("26", r#"<iframe src="/map"></iframe>"#).unwrap());
    }

    #[test]
    fn test_autocomplete() {
        assert!(run_elements("28", r#"<input type="email" autocomplete="email">"#).unwrap());
        assert!(!run_elements("28", r#"<input type="tel" name="phone">"#).unwrap());
    }

    #[test]
    fn test_button_name() {
        assert!(run_elements("30", "<button>إرسال</button>").unwrap());
        assert!(run_elements("30", r#"<button aria-label="إغلاق"><i></i></button>"#).unwrap());
        assert!(run_elements("30", r#"<button><img src="x.png" alt="بحث"></button>"#).unwrap());
        assert!(!run_elements("30", r#"<button><i class="icon"></i></button>"#).unwrap());
    }

    #[test]
    fn test_form_submit() {
        assert!(run_elements("31", r#"<form><input name="q"><button>بحث</button></form>"#).unwrap());
        assert!(run_elements("31", r#"<form><input type="submit" value="إرسال"></form>"#).unwrap());
        assert!(!run_elements("31", r#"<form><input name="q"><button type="button">بحث</button></form>"#).unwrap());
    }

    #[test]
    fn test_single_h1() {
        assert!(run_document("35", "<h1>الخدمات</h1><h2>أ</h2>").passed);
        assert_eq!(run_document("35", "<h2>أ</h2>").reason.as_deref(), Some("Page has no h1"));
        assert_eq!(
            run_document("35", "<h1>أ</h1><h1>ب</h1>").reason.as_deref(),
            Some("Page has 2 h1 elements")
        );
    }

    #[test]
    fn test_table_headers() {
        assert!(run_elements("39", "<table><tr><th>الاسم</th></tr><tr><td>أ</td></tr></table>").unwrap());
        assert!(run_elements("39", r#"<table role="presentation"><tr><td>أ</td></tr></table>"#).unwrap());
        assert!(!run_elements("39", "<table><tr><td>أ</td></tr></table>").unwrap());
    }

    #[test]
    fn test_deprecated_elements() {
        assert!(run_document("44", "<p>نص</p>").passed);
        assert_eq!(
            run_document("44", "<center>نص</center>").reason.as_deref(),
            Some("Deprecated <center> element in use")
        );
    }

    #[test]
    fn test_favicon() {
        assert!(run_document("45", r#"<head><link rel="icon" href="/favicon.ico"></head>"#).passed);
        assert!(run_document("45", r#"<head><link rel="shortcut icon" href="/favicon.ico"></head>"#).passed);
        assert!(!run_document("45", r#"<head><link rel="stylesheet" href="/a.css"></head>"#).passed);
    }

    #[test]
    fn test_meta_description() {
        assert!(run_document("46", r#"<head><meta name="description" content="بوابة الخدمات"></head>"#).passed);
        assert!(!run_document("46", r#"<head><meta name="description" content=""></head>"#).passed);
        assert!(!run_document("46", "<head></head>").passed);
    }
}
