#![no_main]
use clausewitz_save::text::{parse, write_to_vec, NodeWriterBuilder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(root) = parse(data) else {
        return;
    };

    let out = write_to_vec(&root, &NodeWriterBuilder::new()).unwrap();
    let _ = parse(&out);

    let mut preview = Vec::new();
    let mut writer = NodeWriterBuilder::new().max_lines(Some(5)).build(&mut preview);
    writer.write_node(&root).unwrap();
    assert!(writer.lines_written() <= 5);
});
