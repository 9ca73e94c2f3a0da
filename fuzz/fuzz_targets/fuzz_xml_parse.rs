#![no_main]
use libfuzzer_sys::fuzz_target;
use sprigxml::parser::{Classifier, ParseOptions};
use sprigxml::Document;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary bytes under every classifier should never panic
    for classifier in [
        Classifier::Text,
        Classifier::Integer,
        Classifier::Real,
        Classifier::Opaque,
        Classifier::Ignore,
    ] {
        let opts = ParseOptions::default().classifier(classifier);
        let _ = Document::parse_bytes(data, &opts);
    }
});
