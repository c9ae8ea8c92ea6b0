// src/utils/html_debug.rs
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use regex::Regex;
use crate::utils::error::AppError;

/// Saves markup to a file with the given byte ranges highlighted
pub fn save_debug_html(html: &str, path: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;

    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");

    // CSS for highlight colors
    debug_html.push_str(".highlight-marker { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-name { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-email { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-phone { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-address { background-color: #DDA0DD; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, std::cmp::Reverse(h.1)));

    for (start, end, highlight_type) in sorted_highlights {
        // Nested or overlapping matches stay inside the first span
        if start < last_pos {
            continue;
        }
        debug_html.push_str(&html[last_pos..start]);

        let css_class = match highlight_type {
            "marker" => "highlight-marker",
            "name" => "highlight-name",
            "email" => "highlight-email",
            "phone" => "highlight-phone",
            "address" => "highlight-address",
            _ => "highlight-custom",
        };

        debug_html.push_str(&format!("<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type));
        debug_html.push_str(&html[start..end]);
        debug_html.push_str("</span>");

        last_pos = end;
    }

    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");

    file.write_all(debug_html.as_bytes())?;

    tracing::debug!("Saved debug HTML to {}", path.display());
    Ok(())
}

/// Writes `html` to `path` with every match of the given patterns highlighted
pub fn create_debug_html(html: &str, path: &Path, patterns: &[(&Regex, &str)]) -> Result<(), AppError> {
    let mut highlights = Vec::new();

    for (re, highlight_type) in patterns {
        for mat in re.find_iter(html) {
            if !mat.is_empty() {
                highlights.push((mat.start(), mat.end(), *highlight_type));
            }
        }
    }

    save_debug_html(html, path, &highlights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_highlights_are_wrapped_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("debug").join("42.html");
        let marker = Regex::new(r"N°affiliation: \d+").unwrap();
        let digits = Regex::new(r"\d+").unwrap();
        let html = "<h2>N°affiliation: 512345</h2><p>tel 0556</p>";

        create_debug_html(html, &path, &[(&marker, "marker"), (&digits, "phone")]).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert_eq!(saved.matches("highlight-marker\"").count(), 1);
        // "512345" sits inside the marker span and is not wrapped again
        assert_eq!(saved.matches("class=\"highlight-phone\"").count(), 1);
        assert!(saved.contains(">0556</span>"));
        assert!(saved.contains("<p>tel "));
    }
}
