//! The streaming decode-and-normalize pipeline.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::iter::FusedIterator;
use std::mem;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::{ParseOptions, StreamingConfig};
use crate::error::{ImportError, Result};
use crate::event::ParseEvent;
use crate::message::{ParsedMember, ParsedMessage};
use crate::preprocess::{Preprocessor, SourceReader};
use crate::progress::{Progress, ProgressCallback, Stage};

use super::RecordDecoder;
use super::scanner::ArrayScanner;
use super::source::{ByteCounter, CountingReader};

/// Header prefix replayed in front of the rest of the stream.
type Replay = io::Chain<Cursor<Vec<u8>>, BufReader<SourceReader<'static>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Header,
    Records,
    Members,
    Batches,
    Complete,
    Finished,
}

/// Lazily produced event sequence for one parse.
///
/// Each call to [`next`](Iterator::next) does only the work needed for the
/// next event: the file is read while records are pulled, and decoding
/// pauses whenever an event is waiting for the consumer. Dropping the stream
/// at any point closes the file and frees every buffer.
///
/// # Event order
///
/// ```text
/// progress(parsing)        start, 0 bytes
/// meta                     from the header fragment or defaults
/// progress(parsing)*       one per full batch
/// members                  every distinct sender, last name seen
/// messages*                batches in source order
/// progress(done)           bytes_processed == total_bytes
/// done
/// ```
///
/// A stream fault replaces everything after the last emitted event with
/// `progress(error), error`.
///
/// # Example
///
/// ```rust,no_run
/// use chatimport::config::ParseOptions;
/// use chatimport::event::ParseEvent;
/// use chatimport::parser::FormatParser;
/// use chatimport::parsers::WechatJsonParser;
///
/// let parser = WechatJsonParser::new().unwrap();
/// for event in parser.parse(ParseOptions::new("export.json").with_batch_size(1000)) {
///     match event {
///         ParseEvent::Messages { messages } => println!("batch of {}", messages.len()),
///         ParseEvent::Error { reason } => eprintln!("failed: {reason}"),
///         _ => {}
///     }
/// }
/// ```
pub struct EventStream {
    phase: Phase,
    path: PathBuf,
    batch_size: usize,
    on_progress: Option<ProgressCallback>,
    config: StreamingConfig,
    decoder: Box<dyn RecordDecoder>,

    source: Option<Result<SourceReader<'static>>>,
    scanner: Option<ArrayScanner<Replay>>,
    bytes: ByteCounter,
    total_bytes: u64,

    items: usize,
    dropped: usize,
    members: IndexMap<String, ParsedMember>,
    member_count: usize,
    current: Vec<ParsedMessage>,
    pending: VecDeque<Vec<ParsedMessage>>,
    outbox: VecDeque<ParseEvent>,
}

impl EventStream {
    /// Opens `options.file_path` and prepares a parse.
    ///
    /// Invalid options and open failures are not returned here; they become
    /// the stream's terminal `error` event, after the initial progress event.
    pub fn open(
        options: ParseOptions,
        decoder: Box<dyn RecordDecoder>,
        preprocessor: &dyn Preprocessor,
        config: StreamingConfig,
    ) -> Self {
        let bytes = ByteCounter::new();
        if let Err(err) = options.validate() {
            return Self::with_source(options, decoder, config, Err(err), bytes, 0);
        }

        let opened = File::open(&options.file_path).and_then(|file| {
            let len = file.metadata()?.len();
            Ok((file, len))
        });

        match opened {
            Ok((file, total_bytes)) => {
                let counted = CountingReader::new(file, bytes.clone());
                let source = preprocessor.wrap(Box::new(counted));
                tracing::debug!(
                    path = %options.file_path.display(),
                    total_bytes,
                    preprocessor = preprocessor.name(),
                    "opened export"
                );
                Self::with_source(options, decoder, config, Ok(source), bytes, total_bytes)
            }
            Err(err) => Self::with_source(options, decoder, config, Err(err.into()), bytes, 0),
        }
    }

    /// Prepares a parse over an arbitrary reader instead of a file.
    ///
    /// `options.file_path` is still used for fallback naming. `total_bytes`
    /// is the size of the raw input as reported in progress events.
    pub fn from_reader<R>(
        reader: R,
        total_bytes: u64,
        options: ParseOptions,
        decoder: Box<dyn RecordDecoder>,
        preprocessor: &dyn Preprocessor,
        config: StreamingConfig,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        let bytes = ByteCounter::new();
        if let Err(err) = options.validate() {
            return Self::with_source(options, decoder, config, Err(err), bytes, total_bytes);
        }

        let counted = CountingReader::new(reader, bytes.clone());
        let source = preprocessor.wrap(Box::new(counted));
        Self::with_source(options, decoder, config, Ok(source), bytes, total_bytes)
    }

    fn with_source(
        options: ParseOptions,
        decoder: Box<dyn RecordDecoder>,
        config: StreamingConfig,
        source: Result<SourceReader<'static>>,
        bytes: ByteCounter,
        total_bytes: u64,
    ) -> Self {
        Self {
            phase: Phase::Start,
            path: options.file_path,
            batch_size: options.batch_size,
            on_progress: options.on_progress,
            config,
            decoder,
            source: Some(source),
            scanner: None,
            bytes,
            total_bytes,
            items: 0,
            dropped: 0,
            members: IndexMap::new(),
            member_count: 0,
            current: Vec::new(),
            pending: VecDeque::new(),
            outbox: VecDeque::new(),
        }
    }

    /// Raw bytes consumed from the input so far.
    pub fn bytes_processed(&self) -> u64 {
        self.bytes.get()
    }

    /// Size of the raw input.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Messages accepted so far.
    pub fn items_processed(&self) -> usize {
        self.items
    }

    /// Records dropped by validation so far.
    pub fn records_dropped(&self) -> usize {
        self.dropped
    }

    /// Path of the export being parsed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn advance(&mut self) {
        let step = match self.phase {
            Phase::Start => {
                self.start();
                Ok(())
            }
            Phase::Header => self.read_header(),
            Phase::Records => self.read_records(),
            Phase::Members => {
                self.emit_members();
                Ok(())
            }
            Phase::Batches => {
                self.emit_batch();
                Ok(())
            }
            Phase::Complete => {
                self.complete();
                Ok(())
            }
            Phase::Finished => Ok(()),
        };

        if let Err(err) = step {
            self.fail(&err);
        }
    }

    fn start(&mut self) {
        tracing::info!(
            path = %self.path.display(),
            format = self.decoder.format_name(),
            batch_size = self.batch_size,
            "starting parse"
        );
        self.emit_progress(Stage::Parsing, 0, "Starting parse".to_string());
        self.phase = Phase::Header;
    }

    fn read_header(&mut self) -> Result<()> {
        let source = self
            .source
            .take()
            .unwrap_or_else(|| Err(ImportError::unexpected_eof("opening the export")))?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size.max(1), source);
        let mut head = Vec::with_capacity(self.config.header_bytes);
        (&mut reader)
            .take(self.config.header_bytes as u64)
            .read_to_end(&mut head)?;

        let meta = self
            .decoder
            .decode_meta(&String::from_utf8_lossy(&head), &self.path);
        tracing::debug!(name = %meta.name, chat_type = %meta.chat_type, "decoded header");

        let replay = Cursor::new(head).chain(reader);
        let mut scanner = ArrayScanner::new(replay, self.config.max_record_size);
        if !scanner.seek_array(self.decoder.records_key())? {
            return Err(ImportError::invalid_format(
                self.decoder.format_name(),
                format!("missing '{}' array", self.decoder.records_key()),
            ));
        }

        self.scanner = Some(scanner);
        self.outbox.push_back(ParseEvent::Meta(meta));
        self.phase = Phase::Records;
        Ok(())
    }

    /// Decodes records until a batch fills up or the array ends.
    fn read_records(&mut self) -> Result<()> {
        loop {
            let Some(scanner) = self.scanner.as_mut() else {
                return Err(ImportError::unexpected_eof("reading the record array"));
            };
            let value = match scanner.next_element()? {
                Some(bytes) => serde_json::from_slice::<Value>(bytes)?,
                None => break,
            };

            let Some(message) = self.decoder.normalize(value) else {
                self.dropped += 1;
                continue;
            };
            self.observe_member(&message);
            self.current.push(message);
            self.items += 1;

            if self.current.len() >= self.batch_size {
                self.pending.push_back(mem::take(&mut self.current));
                self.emit_progress(
                    Stage::Parsing,
                    self.bytes.get(),
                    format!("Parsed {} messages", self.items),
                );
                return Ok(());
            }
        }

        // Release the file before the buffered output is drained.
        if let Some(mut scanner) = self.scanner.take() {
            if !scanner.finish_document()? {
                return Err(ImportError::invalid_format(
                    self.decoder.format_name(),
                    format!(
                        "unexpected content after the '{}' array",
                        self.decoder.records_key()
                    ),
                ));
            }
        }
        if !self.current.is_empty() {
            self.pending.push_back(mem::take(&mut self.current));
        }
        if self.dropped > 0 {
            tracing::debug!(dropped = self.dropped, "dropped invalid records");
        }
        self.phase = Phase::Members;
        Ok(())
    }

    /// Last write wins for observed display fields; the id never changes.
    fn observe_member(&mut self, message: &ParsedMessage) {
        match self.members.get_mut(&message.sender_platform_id) {
            Some(member) => {
                if !message.sender_name_inferred {
                    member
                        .account_name
                        .clone_from(&message.sender_account_name);
                }
                if let Some(nickname) = &message.sender_group_nickname {
                    member.group_nickname = Some(nickname.clone());
                }
            }
            None => {
                self.members.insert(
                    message.sender_platform_id.clone(),
                    ParsedMember {
                        platform_id: message.sender_platform_id.clone(),
                        account_name: message.sender_account_name.clone(),
                        group_nickname: message.sender_group_nickname.clone(),
                    },
                );
            }
        }
    }

    fn emit_members(&mut self) {
        let members: Vec<ParsedMember> = mem::take(&mut self.members).into_values().collect();
        self.member_count = members.len();
        self.outbox.push_back(ParseEvent::Members { members });
        self.phase = Phase::Batches;
    }

    fn emit_batch(&mut self) {
        match self.pending.pop_front() {
            Some(messages) => self.outbox.push_back(ParseEvent::Messages { messages }),
            None => self.phase = Phase::Complete,
        }
    }

    fn complete(&mut self) {
        self.total_bytes = self.total_bytes.max(self.bytes.get());
        self.emit_progress(
            Stage::Done,
            self.total_bytes,
            format!(
                "Parsed {} messages from {} members",
                self.items, self.member_count
            ),
        );
        self.outbox.push_back(ParseEvent::Done {
            message_count: self.items,
            member_count: self.member_count,
        });
        tracing::info!(
            path = %self.path.display(),
            messages = self.items,
            members = self.member_count,
            dropped = self.dropped,
            "parse complete"
        );
        self.phase = Phase::Finished;
    }

    /// Terminates the sequence. Buffered output is discarded.
    fn fail(&mut self, err: &ImportError) {
        if err.is_stream_fault() {
            tracing::error!(path = %self.path.display(), error = %err, "parse failed");
        } else {
            tracing::warn!(path = %self.path.display(), error = %err, "parse rejected");
        }

        self.source = None;
        self.scanner = None;
        self.members.clear();
        self.current.clear();
        self.pending.clear();

        self.emit_progress(Stage::Error, self.bytes.get(), err.to_string());
        self.outbox.push_back(ParseEvent::Error {
            reason: err.to_string(),
        });
        self.phase = Phase::Finished;
    }

    fn emit_progress(&mut self, stage: Stage, bytes_processed: u64, message: String) {
        let progress = Progress::new(
            stage,
            bytes_processed,
            self.total_bytes,
            self.items,
            message,
        );
        if let Some(callback) = &self.on_progress {
            callback(&progress);
        }
        self.outbox.push_back(ParseEvent::Progress(progress));
    }
}

impl Iterator for EventStream {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.outbox.pop_front() {
                return Some(event);
            }
            if self.phase == Phase::Finished {
                return None;
            }
            self.advance();
        }
    }
}

impl FusedIterator for EventStream {}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("phase", &self.phase)
            .field("path", &self.path)
            .field("format", &self.decoder.format_name())
            .field("bytes_processed", &self.bytes.get())
            .field("total_bytes", &self.total_bytes)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatType, MessageType, ParsedMeta};
    use crate::parser::Platform;
    use crate::preprocess::IDENTITY;
    use std::sync::{Arc, Mutex};

    /// Records are `{"u": sender, "t": timestamp}`.
    struct PlainDecoder;

    impl RecordDecoder for PlainDecoder {
        fn format_name(&self) -> &'static str {
            "plain"
        }

        fn records_key(&self) -> &str {
            "records"
        }

        fn decode_meta(&self, head: &str, path: &Path) -> ParsedMeta {
            let chat_type = if head.contains("\"private\"") {
                ChatType::Private
            } else {
                ChatType::Group
            };
            let name = path.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
            ParsedMeta::new(name, Platform::Unknown, chat_type)
        }

        fn normalize(&self, record: Value) -> Option<ParsedMessage> {
            let sender = record.get("u")?.as_str()?;
            let timestamp = record.get("t")?.as_i64()?;
            Some(ParsedMessage::new(sender, sender, timestamp, MessageType::Text))
        }
    }

    fn stream(input: &'static str, batch_size: usize) -> EventStream {
        EventStream::from_reader(
            input.as_bytes(),
            input.len() as u64,
            ParseOptions::new("room.json").with_batch_size(batch_size),
            Box::new(PlainDecoder),
            &IDENTITY,
            StreamingConfig::default(),
        )
    }

    fn kinds(events: &[ParseEvent]) -> Vec<&'static str> {
        events.iter().map(ParseEvent::kind).collect()
    }

    #[test]
    fn test_event_order_with_batches() {
        let input = r#"{"records": [{"u": "a", "t": 1}, {"u": "b", "t": 2}, {"t": 3}, {"u": "a", "t": 4}]}"#;
        let mut s = stream(input, 2);
        let events: Vec<_> = s.by_ref().collect();
        assert_eq!(s.items_processed(), 3);
        assert_eq!(s.records_dropped(), 1);
        assert_eq!(
            kinds(&events),
            vec!["progress", "meta", "progress", "members", "messages", "messages", "progress", "done"]
        );
        assert_eq!(
            events.last(),
            Some(&ParseEvent::Done {
                message_count: 3,
                member_count: 2
            })
        );
    }

    #[test]
    fn test_final_progress_covers_whole_input() {
        let input = r#"{"records": [{"u": "a", "t": 1}]}"#;
        let events: Vec<_> = stream(input, 10).collect();
        let ParseEvent::Progress(done) = &events[events.len() - 2] else {
            panic!("expected progress");
        };
        assert_eq!(done.stage, Stage::Done);
        assert_eq!(done.bytes_processed, input.len() as u64);
        assert_eq!(done.bytes_processed, done.total_bytes);
        assert_eq!(done.items_processed, 1);
    }

    #[test]
    fn test_empty_array() {
        let events: Vec<_> = stream(r#"{"records": []}"#, 10).collect();
        assert_eq!(kinds(&events), vec!["progress", "meta", "members", "progress", "done"]);
    }

    #[test]
    fn test_zero_batch_size_is_an_error_event() {
        let events: Vec<_> = stream(r#"{"records": []}"#, 0).collect();
        assert_eq!(kinds(&events), vec!["progress", "progress", "error"]);
    }

    #[test]
    fn test_missing_array_is_fatal() {
        let events: Vec<_> = stream(r#"{"other": []}"#, 10).collect();
        assert_eq!(kinds(&events), vec!["progress", "progress", "error"]);
        let ParseEvent::Error { reason } = events.last().unwrap() else {
            panic!("expected error");
        };
        assert!(reason.contains("records"));
    }

    #[test]
    fn test_syntax_error_in_record_is_fatal() {
        let input = r#"{"records": [{"u": "a", "t": 1}, {"u": oops}]}"#;
        let events: Vec<_> = stream(input, 1).collect();
        assert_eq!(
            kinds(&events),
            vec!["progress", "meta", "progress", "progress", "error"]
        );
    }

    #[test]
    fn test_truncated_input_is_fatal() {
        let input = r#"{"records": [{"u": "a", "t": 1}, {"u": "b""#;
        let events: Vec<_> = stream(input, 10).collect();
        assert_eq!(events.last().map(ParseEvent::kind), Some("error"));
        assert!(!events.iter().any(|e| matches!(e, ParseEvent::Messages { .. })));
    }

    #[test]
    fn test_missing_closing_brace_is_fatal() {
        let input = r#"{"records": [{"u": "a", "t": 1}]"#;
        let events: Vec<_> = stream(input, 10).collect();
        assert_eq!(kinds(&events), vec!["progress", "meta", "progress", "error"]);
        let ParseEvent::Error { reason } = events.last().unwrap() else {
            panic!("expected error");
        };
        assert!(reason.contains("end of file"));
    }

    #[test]
    fn test_trailing_content_is_fatal() {
        let input = r#"{"records": [{"u": "a", "t": 1}]} GARBAGE"#;
        let events: Vec<_> = stream(input, 10).collect();
        assert_eq!(kinds(&events), vec!["progress", "meta", "progress", "error"]);

        let input = r#"{"records": [{"u": "a", "t": 1}] GARBAGE"#;
        let events: Vec<_> = stream(input, 10).collect();
        assert_eq!(events.last().map(ParseEvent::kind), Some("error"));
    }

    #[test]
    fn test_keys_after_array_are_consumed() {
        let input = "{\"records\": [{\"u\": \"a\", \"t\": 1}], \"extra\": {\"s\": \"} ]\"}}\n";
        let mut s = stream(input, 10);
        let events: Vec<_> = s.by_ref().collect();
        assert_eq!(events.last().map(ParseEvent::kind), Some("done"));
        assert_eq!(s.bytes_processed(), input.len() as u64);
        assert_eq!(s.records_dropped(), 0);
    }

    #[test]
    fn test_callback_matches_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |p: &Progress| {
            sink.lock().unwrap().push(p.clone());
        });

        let input = r#"{"records": [{"u": "a", "t": 1}, {"u": "b", "t": 2}]}"#;
        let events: Vec<_> = EventStream::from_reader(
            input.as_bytes(),
            input.len() as u64,
            ParseOptions::new("room.json")
                .with_batch_size(1)
                .with_progress(callback),
            Box::new(PlainDecoder),
            &IDENTITY,
            StreamingConfig::default(),
        )
        .collect();

        let from_events: Vec<Progress> = events
            .into_iter()
            .filter_map(|e| match e {
                ParseEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(*seen.lock().unwrap(), from_events);
        assert_eq!(from_events.len(), 4);
    }

    #[test]
    fn test_bytes_processed_monotonic() {
        let input = r#"{"records": [{"u": "a", "t": 1}, {"u": "b", "t": 2}, {"u": "c", "t": 3}]}"#;
        let mut last = 0;
        for event in stream(input, 1) {
            if let ParseEvent::Progress(p) = event {
                assert!(p.bytes_processed >= last);
                last = p.bytes_processed;
            }
        }
        assert_eq!(last, input.len() as u64);
    }

    #[test]
    fn test_fused_after_terminal_event() {
        let mut s = stream(r#"{"records": []}"#, 10);
        while s.next().is_some() {}
        assert!(s.next().is_none());
        assert!(s.next().is_none());
    }

    #[test]
    fn test_open_missing_file() {
        let events: Vec<_> = EventStream::open(
            ParseOptions::new("/no/such/dir/export.json"),
            Box::new(PlainDecoder),
            &IDENTITY,
            StreamingConfig::default(),
        )
        .collect();
        assert_eq!(kinds(&events), vec!["progress", "progress", "error"]);
    }
}
