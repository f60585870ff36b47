use config::{FileStoredFormat, Format, Map, Value, ValueKind};
use ini::{Ini, ParseOption};
use std::error::Error;

/// INI as a credentials file is written: values are taken verbatim.
///
/// `config`'s built-in INI format unescapes backslashes and strips quotes,
/// which corrupts passwords such as `p\tw` or `"quoted"`. Keys outside any
/// section are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimIni;

impl Format for VerbatimIni {
    fn parse(
        &self,
        uri: Option<&String>,
        text: &str,
    ) -> Result<Map<String, Value>, Box<dyn Error + Send + Sync>> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, options)?;

        let mut root = Map::new();
        for (section, properties) in &ini {
            let Some(section) = section else { continue };
            let entries: Map<String, Value> = properties
                .iter()
                .map(|(k, v)| (k.to_owned(), Value::new(uri, ValueKind::String(v.to_owned()))))
                .collect();
            root.insert(section.to_owned(), Value::new(uri, ValueKind::Table(entries)));
        }
        Ok(root)
    }
}

impl FileStoredFormat for VerbatimIni {
    fn file_extensions(&self) -> &'static [&'static str] {
        &["ini"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(text: &str, name: &str) -> Map<String, Value> {
        let root = VerbatimIni.parse(None, text).unwrap();
        root.get(name).cloned().unwrap().into_table().unwrap()
    }

    fn string(entries: &Map<String, Value>, key: &str) -> String {
        entries[key].clone().into_string().unwrap()
    }

    #[test]
    fn backslashes_and_quotes_survive() {
        let entries = section(
            "[mysql]\npassword=p\\tw;x#y\"z\nquoted=\"quoted\"\nwin=C:\\Windows\n",
            "mysql",
        );
        assert_eq!(string(&entries, "password"), "p\\tw;x#y\"z");
        assert_eq!(string(&entries, "quoted"), "\"quoted\"");
        assert_eq!(string(&entries, "win"), "C:\\Windows");
    }

    #[test]
    fn keys_outside_sections_are_dropped() {
        let root = VerbatimIni.parse(None, "stray=1\n[mysql]\nhost=localhost\n").unwrap();
        assert!(!root.contains_key("stray"));
        assert!(root.contains_key("mysql"));
    }
}
