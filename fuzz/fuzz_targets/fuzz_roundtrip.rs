#![no_main]
use libfuzzer_sys::fuzz_target;
use sprigxml::parser::ParseOptions;
use sprigxml::serial::{save_string, SaveOptions};
use sprigxml::Document;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let opts = ParseOptions::default();
        // Whatever parses must save to something that parses again
        if let Ok(doc) = Document::parse_str(s, &opts) {
            let saved = save_string(&doc, doc.root(), &SaveOptions::default()).unwrap();
            if let Err(err) = Document::parse_str(&saved, &opts) {
                panic!("saved output does not parse: {err}\n{saved}");
            }
        }
    }
});
