#![no_main]
use std::ops::ControlFlow;

use libfuzzer_sys::fuzz_target;
use sprigxml::parser::ParseOptions;
use sprigxml::sax::{self, SaxEvent};

fuzz_target!(|data: &[u8]| {
    // Retain every other node; the handler must never see a dead node
    let mut n = 0u32;
    let mut handler = sax::from_fn(|cx, node, event| {
        assert!(cx.document().contains(node), "{event} on a dead node");
        n += 1;
        if n % 2 == 0 || event == SaxEvent::ElementOpen {
            cx.retain(node);
        }
        ControlFlow::Continue(())
    });
    let _ = sax::parse_sax_bytes(data, &ParseOptions::default(), &mut handler);
});
