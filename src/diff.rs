#[cfg(feature = "color")]
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

pub fn compare(expected: &str, actual: &str) -> String {
    let mut result = String::new();

    let clean_expected = expected.replace("\r\n", "\n");
    let clean_actual = actual.replace("\r\n", "\n");

    let diff = TextDiff::from_lines(&clean_expected, &clean_actual);

    for change in diff.iter_all_changes() {
        let mut line = change.value().to_string();
        if change.missing_newline() {
            line.push('\n');
        }

        match change.tag() {
            ChangeTag::Equal => result.push_str(&line),
            ChangeTag::Delete => {
                #[cfg(feature = "color")]
                result.push_str(&line.red().to_string());
                #[cfg(not(feature = "color"))]
                result.push_str(&line);
            }
            ChangeTag::Insert => {
                #[cfg(feature = "color")]
                result.push_str(&line.bright_green().to_string());
                #[cfg(not(feature = "color"))]
                result.push_str(&line);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_every_line() {
        colored_off();

        let result = compare("\r\nGET /hello\r\n", "\r\nGET /bye\r\naccept: text\r\n");

        assert_eq!("\nGET /hello\nGET /bye\naccept: text\n", result);
    }

    #[cfg(feature = "color")]
    fn colored_off() {
        colored::control::set_override(false);
    }

    #[cfg(not(feature = "color"))]
    fn colored_off() {}
}
