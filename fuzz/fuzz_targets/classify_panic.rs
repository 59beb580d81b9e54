#![no_main]
use libfuzzer_sys::fuzz_target;
use swiftdev_log::OutputStream;

fuzz_target!(|data: &[u8]| {
    // Tool output is decoded lossily before it reaches the classifier.
    let s = String::from_utf8_lossy(data);

    // Feed in two uneven chunks to exercise line reassembly.
    let mut split = data.first().map_or(0, |b| *b as usize) % (s.len() + 1);
    while !s.is_char_boundary(split) {
        split -= 1;
    }
    let mut stream = OutputStream::new();
    let mut events = stream.update(&s[..split]);
    events.extend(stream.update(&s[split..]));
    events.extend(stream.finish());

    let whole = OutputStream::new().parse(&s);
    assert_eq!(events.len(), whole.len());
});
