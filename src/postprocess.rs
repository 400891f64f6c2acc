use crate::config::Config;
use unicode_normalization::UnicodeNormalization;

pub fn clean_markdown(cfg: &Config, md: &str) -> String {
    let mut out = md.to_string();

    if cfg.postprocess.normalize_newlines {
        out = out.replace("\r\n", "\n");
    }

    if cfg.postprocess.normalize_unicode {
        out = out.nfkc().collect::<String>();
    }

    out = sanitize_control_chars(&out, &cfg.postprocess.control_chars_to_sanitize);

    if cfg.postprocess.trim_trailing_whitespace {
        out = trim_line_ends(&out);
    }

    out
}

fn sanitize_control_chars(s: &str, codes: &[u8]) -> String {
    if codes.is_empty() {
        return s.to_string();
    }

    let mut mask = [false; 128];
    for &code in codes {
        if (code as usize) < mask.len() {
            mask[code as usize] = true;
        }
    }

    s.chars()
        .filter(|&ch| {
            if matches!(ch, '\n' | '\r' | '\t') {
                return true;
            }
            let cp = ch as u32;
            cp >= 128 || !mask[cp as usize]
        })
        .collect()
}

// Trims spaces and tabs only; a line's trailing `\r` is kept.
fn trim_line_ends(s: &str) -> String {
    s.split('\n')
        .map(|line| match line.strip_suffix('\r') {
            Some(body) => format!("{}\r", body.trim_end_matches([' ', '\t'])),
            None => line.trim_end_matches([' ', '\t']).to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
