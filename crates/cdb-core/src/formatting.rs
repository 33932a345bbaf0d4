//! Caption composition, display labels, code generation, and listing
//! pagination.

use rand::{seq::SliceRandom, Rng};

/// Escape HTML special characters for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// First letter upper, rest lower.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Compose a camera caption: optional bold custom-name line, then the
/// capitalized caption wrapped in a matching decorative emoji pair.
pub fn format_caption(
    caption: &str,
    custom_name: Option<&str>,
    caption_emojis: &[String],
    name_emojis: &[String],
) -> String {
    let mut rng = rand::thread_rng();
    let emoji = caption_emojis
        .choose(&mut rng)
        .map(String::as_str)
        .unwrap_or("");

    let name_part = match custom_name {
        Some(name) => {
            let name_emoji = name_emojis.choose(&mut rng).map(String::as_str).unwrap_or("");
            format!("{name_emoji} <b>{}</b>\n\n", escape_html(name))
        }
        None => String::new(),
    };

    format!("{name_part}{emoji} {} {emoji}", escape_html(&capitalize(caption)))
}

pub fn format_project_label(display_name: &str) -> String {
    format!("📁 {}", display_name.trim())
}

pub fn format_pack_label(display_name: &str, pack_emojis: &[String]) -> String {
    let mut rng = rand::thread_rng();
    let emoji = pack_emojis.choose(&mut rng).map(String::as_str).unwrap_or("📦");
    format!("{emoji} {}", display_name.trim())
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LEN: usize = 8;

/// Random camera access code. Uniqueness is enforced by the store; callers
/// regenerate on collision.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Keep only alphanumerics plus `.`, `_`, `-` from an untrusted filename.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Split a listing into messages no longer than `limit` characters: accumulate
/// entries after the header, flush whenever the next entry would cross the
/// threshold. Entries longer than the limit get a page of their own.
pub fn paginate(header: &str, entries: impl IntoIterator<Item = String>, limit: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = header.to_string();

    for entry in entries {
        if !current.is_empty()
            && current.chars().count() + entry.chars().count() > limit
        {
            pages.push(current);
            current = String::new();
        }
        current.push_str(&entry);
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_matches_listing_style() {
        assert_eq!(capitalize("test CAPTION"), "Test caption");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("x"), "X");
    }

    #[test]
    fn caption_wraps_in_emoji_pair() {
        let pool = vec!["🔥".to_string()];
        let names = vec!["📌".to_string()];
        let got = format_caption("test", None, &pool, &names);
        assert_eq!(got, "🔥 Test 🔥");

        let got = format_caption("test", Some("Lobby cam"), &pool, &names);
        assert_eq!(got, "📌 <b>Lobby cam</b>\n\n🔥 Test 🔥");
    }

    #[test]
    fn caption_escapes_html() {
        let pool = vec!["⚡".to_string()];
        let got = format_caption("a <b> & c", None, &pool, &[]);
        assert!(got.contains("&lt;b&gt; &amp; c"));
    }

    #[test]
    fn codes_are_eight_uppercase_alphanumerics() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn safe_filename_strips_path_tricks() {
        assert_eq!(safe_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(safe_filename("pack v2 (final).zip"), "packv2final.zip");
    }

    #[test]
    fn paginate_flushes_before_crossing_limit() {
        let entries: Vec<String> = (0..10).map(|i| format!("entry {i}\n")).collect();
        let pages = paginate("header\n", entries.clone(), 30);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= 30 + entries[0].chars().count());
        }
        let joined = pages.concat();
        assert!(joined.starts_with("header\n"));
        assert!(joined.ends_with("entry 9\n"));
    }

    #[test]
    fn paginate_short_listing_is_one_message() {
        let pages = paginate("h", vec!["a".to_string(), "b".to_string()], 4000);
        assert_eq!(pages, vec!["hab".to_string()]);
    }
}
