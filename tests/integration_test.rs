use proptest::prelude::*;
use serde_json::json;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Write};
use std::rc::Rc;
use streampipe::pipeline::stages::{DefinitionsStage, IdentityStage, XorStage};
use streampipe::pipeline::{Contents, StageCall};
use streampipe::{
    binary_stage, text_stage, Mode, PipeValue, PipelineConfig, SharedBuffer, StageOptions,
    StreamPipe, StreamPipeError,
};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct CapturedStdout(Rc<RefCell<Vec<u8>>>);

impl Write for CapturedStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read a file, xor it twice, and write it back out
#[test]
fn test_file_to_file_binary_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("input.bin");
    let output_path = temp_dir.path().join("output.bin");

    let original: Vec<u8> = (0u8..=255).collect();
    fs::write(&input_path, &original).unwrap();

    let xor = XorStage::new();
    let mut pipe = StreamPipe::builder()
        .binary()
        .source(input_path.as_path())
        .destination(output_path.as_path())
        .build()
        .unwrap();
    pipe.iterate([
        (&xor, StageOptions::new()),
        (&xor, StageOptions::new()),
    ])
    .unwrap();
    pipe.close().unwrap();

    assert_eq!(fs::read(&output_path).unwrap(), original);
}

/// Extract definitions from a source file into another file
#[test]
fn test_definitions_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("module.py");
    let output_path = temp_dir.path().join("defs.txt");
    fs::write(
        &input_path,
        "def first():\n    pass\n\nclass A:\n    def method(self):\n        pass\n",
    )
    .unwrap();

    StreamPipe::open(input_path.as_path(), output_path.as_path(), Mode::Text)
        .unwrap()
        .scope(|pipe| pipe.run(&DefinitionsStage::new(), &StageOptions::new()))
        .unwrap();

    assert_eq!(fs::read_to_string(&output_path).unwrap(), "first\nmethod\n");
}

/// Stdin round trip with no stages in text mode
#[test]
fn test_stdin_round_trip_without_stages() {
    let stdout = CapturedStdout::default();

    StreamPipe::builder()
        .stdin(Cursor::new(b"def foo():\n".to_vec()))
        .stdout(stdout.clone())
        .build()
        .unwrap()
        .close()
        .unwrap();

    assert_eq!(
        String::from_utf8(stdout.0.borrow().clone()).unwrap(),
        "def foo():\n"
    );
}

/// Binary stdin to stdout keeps arbitrary bytes intact
#[test]
fn test_binary_stdio_passes_raw_bytes() {
    let stdout = CapturedStdout::default();
    let xor = XorStage::new();

    let mut pipe = StreamPipe::builder()
        .binary()
        .stdin(Cursor::new(vec![0x00u8, 0xFF, 0x80]))
        .stdout(stdout.clone())
        .build()
        .unwrap();
    pipe.run(&xor, &StageOptions::new().with("key", 0xFF))
        .unwrap();
    drop(pipe);

    assert_eq!(stdout.0.borrow().as_slice(), &[0xFFu8, 0x00, 0x7F]);
}

/// A failing stage stops the sequence but the flush still happens
#[test]
fn test_failure_mid_sequence_still_flushes() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("partial.txt");

    let shout = text_stage("shout", |out, input, _| {
        out.push_str(&input.read_text()?.to_uppercase());
        Ok(())
    });
    let explode = text_stage("explode", |_, _, _| Err("explode always fails".into()));
    let never = text_stage("never", |_, _, _| panic!("must not run"));

    let result = StreamPipe::builder()
        .source(PipeValue::text("quiet"))
        .destination(output_path.as_path())
        .build()
        .unwrap()
        .scope(|pipe| {
            pipe.iterate([
                StageCall::new(&shout),
                StageCall::new(&explode),
                StageCall::new(&never),
            ])
        });

    assert!(matches!(result, Err(StreamPipeError::GenericError(_))));
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "QUIET");
}

/// A panicking stage still gets its output flushed by drop
#[test]
fn test_panic_still_flushes() {
    let output = SharedBuffer::text();
    let destination = output.clone();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let mut pipe = StreamPipe::builder()
            .source(PipeValue::text("before panic"))
            .destination(destination)
            .build()
            .unwrap();
        let boom = text_stage("boom", |_, _, _| panic!("stage panicked"));
        let _ = pipe.run(&boom, &StageOptions::new());
    }));

    assert!(outcome.is_err());
    assert_eq!(
        output.contents(),
        Contents::Text("before panic".to_string())
    );
}

/// Bytes produced inside a text pipeline are decoded on flush
#[test]
fn test_text_mode_coerces_byte_output() {
    let output = SharedBuffer::text();
    let encode = binary_stage("encode", |out, input, _| {
        out.push_bytes(input.read_text()?.as_bytes());
        Ok(())
    });

    let mut pipe = StreamPipe::builder()
        .source(PipeValue::text("grüße"))
        .destination(output.clone())
        .build()
        .unwrap();
    pipe.run(&encode, &StageOptions::new()).unwrap();
    pipe.close().unwrap();

    assert_eq!(output.contents(), Contents::Text("grüße".to_string()));
}

/// Unsupported references fail where they are resolved
#[test]
fn test_type_condition_resolution_points() {
    let source_result = StreamPipe::builder()
        .source(json!(42))
        .stdin(io::empty())
        .build();
    assert!(matches!(
        source_result,
        Err(StreamPipeError::TypeCondition(_))
    ));

    let pipe = StreamPipe::builder()
        .source(PipeValue::text("fine"))
        .destination(json!(42))
        .build()
        .unwrap();
    assert!(matches!(
        pipe.close(),
        Err(StreamPipeError::TypeCondition(_))
    ));

    let mismatched = StreamPipe::builder()
        .binary()
        .source(PipeValue::text("wrong mode"))
        .build();
    assert!(matches!(mismatched, Err(StreamPipeError::TypeCondition(_))));
}

/// A configuration file drives the whole pipeline
#[test]
fn test_config_driven_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("in.bin");
    let output_path = temp_dir.path().join("out.bin");
    fs::write(&input_path, b"secret").unwrap();

    let config = PipelineConfig::from_json_str(
        &json!({
            "source": input_path.to_string_lossy(),
            "destination": output_path.to_string_lossy(),
            "mode": "binary",
            "stages": [
                { "stage": "xor", "options": { "key": 7 } },
                { "stage": "identity" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let pipeline = config.build_pipeline("config-test").unwrap();
    StreamPipe::open(config.source(), config.destination(), config.mode)
        .unwrap()
        .scope(|pipe| pipeline.execute(pipe))
        .unwrap();

    let expected: Vec<u8> = b"secret".iter().map(|b| b ^ 7).collect();
    assert_eq!(fs::read(&output_path).unwrap(), expected);
}

proptest! {
    #[test]
    fn prop_identity_preserves_text(s in ".*") {
        let output = SharedBuffer::text();
        let mut pipe = StreamPipe::builder()
            .source(PipeValue::text(s.clone()))
            .destination(output.clone())
            .build()
            .unwrap();
        pipe.run(&IdentityStage::new(Mode::Text), &StageOptions::new()).unwrap();
        pipe.close().unwrap();

        prop_assert_eq!(output.contents(), Contents::Text(s));
    }

    #[test]
    fn prop_xor_twice_is_identity(bytes in proptest::collection::vec(any::<u8>(), 0..512), key in any::<u8>()) {
        let output = SharedBuffer::binary();
        let xor = XorStage::new();
        let options = StageOptions::new().with("key", key);

        let mut pipe = StreamPipe::builder()
            .binary()
            .source(PipeValue::binary(bytes.clone()))
            .destination(output.clone())
            .build()
            .unwrap();
        pipe.iterate([(&xor, options.clone()), (&xor, options)]).unwrap();
        pipe.close().unwrap();

        prop_assert_eq!(output.contents(), Contents::Bytes(bytes));
    }
}
