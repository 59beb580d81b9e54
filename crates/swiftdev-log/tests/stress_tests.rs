use swiftdev_log::OutputStream;
use swiftdev_log::ir::{EventPayload, Severity};

#[test]
fn test_char_by_char_streaming() {
    let input = "Sources/A/a.swift:7:3: error: use of unresolved identifier 'q'
[1/2] Compiling A a.swift
Sources/A/b.swift:1:1: warning: deprecated
";
    let mut stream = OutputStream::new();
    let mut events = Vec::new();

    // Feed one character at a time
    for c in input.chars() {
        let mut buf = [0; 4];
        let s = c.encode_utf8(&mut buf);
        events.extend(stream.update(s));
    }
    events.extend(stream.finish());

    assert_eq!(events.len(), 3);

    if let EventPayload::CompilerDiagnostic { line, column, severity, .. } = &events[0].payload {
        assert_eq!((*line, *column), (7, 3));
        assert_eq!(*severity, Severity::Error);
    } else {
        panic!("Expected CompilerDiagnostic");
    }
    assert!(matches!(events[1].payload, EventPayload::PlainLine { .. }));
    assert!(matches!(
        events[2].payload,
        EventPayload::CompilerDiagnostic { severity: Severity::Warning, .. }
    ));
}

#[test]
fn test_many_diagnostics_in_one_chunk() {
    let chunk: String = (1..=500)
        .map(|n| format!("f{n}.swift:{n}:1: error: e{n}\n"))
        .collect();
    let events = OutputStream::new().parse(&chunk);
    assert_eq!(events.len(), 500);
    for (i, event) in events.iter().enumerate() {
        let diagnostic = event.payload.to_diagnostic().unwrap();
        assert_eq!(diagnostic.line as usize, i + 1);
    }
}

#[test]
fn test_non_ascii_split_points() {
    let input = "naïve.swift:2:4: warning: ünused → value\n";
    let mut stream = OutputStream::new();
    let mut events = Vec::new();
    for c in input.chars() {
        events.extend(stream.update(&c.to_string()));
    }
    assert_eq!(events.len(), 1);
    let diagnostic = events[0].payload.to_diagnostic().unwrap();
    assert_eq!(diagnostic.file, "naïve.swift");
    assert_eq!(diagnostic.message, "ünused → value");
}

#[test]
fn test_every_split_point_matches_whole_parse() {
    let input = "a.swift:99999999999: error: T.t : XCTAssertTrue failed\n\
T.swift:15: error: S.t : XCTAssertTrue failed - \n\
(lldb) Process 9 stopped\n\
naïve.swift:2:4: warning: x";
    let whole = OutputStream::new().parse(input);
    assert_eq!(whole.len(), 4);

    for split in (0..=input.len()).filter(|i| input.is_char_boundary(*i)) {
        let mut stream = OutputStream::new();
        let mut events = stream.update(&input[..split]);
        events.extend(stream.update(&input[split..]));
        events.extend(stream.finish());
        assert_eq!(events, whole, "split at byte {split}");
    }
}
