use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Handle whose reported size is independent of its content.
struct SizedFile {
    name: String,
    size: u64,
    content: Option<Vec<u8>>,
    reads: Arc<AtomicUsize>,
}

impl SizedFile {
    fn new(name: &str, size: u64, content: Option<&[u8]>) -> Self {
        Self {
            name: name.to_string(),
            size,
            content: content.map(<[u8]>::to_vec),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SelectedFile for SizedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.content
            .clone()
            .ok_or_else(|| anyhow!("device not ready"))
    }
}

#[tokio::test]
async fn stages_file_as_base64_payload_without_data_url_prefix() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    let file = MemoryFile::new("notice.pdf", b"%PDF-1.7 notice".to_vec());

    let outcome = cache
        .on_file_selected(Some(&file), &mut form, Duration::ZERO)
        .await;

    assert!(matches!(outcome, FileSelection::Cached { ref filename, size_bytes: 15 } if filename == "notice.pdf"));
    let staged = cache.attachment().expect("staged");
    assert_eq!(staged.filename, "notice.pdf");
    assert_eq!(staged.payload_b64, STANDARD.encode(b"%PDF-1.7 notice"));
    assert_eq!(staged.mime_type.as_deref(), Some("application/pdf"));
    assert!(cache.is_ready());
    assert!(!form.progress().visible);
    assert_eq!(form.progress().shown, 1);
    assert_eq!(form.attachment_input(), Some("notice.pdf"));
}

#[tokio::test]
async fn new_selection_replaces_previous_file_entirely() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    let first = MemoryFile::new("first.pdf", vec![1u8; 2048]);
    let second = MemoryFile::new("second.png", vec![2u8; 16]);

    cache
        .on_file_selected(Some(&first), &mut form, Duration::ZERO)
        .await;
    cache
        .on_file_selected(Some(&second), &mut form, Duration::ZERO)
        .await;

    let staged = cache.attachment().expect("staged");
    assert_eq!(
        staged,
        &CachedAttachment {
            filename: "second.png".into(),
            size_bytes: 16,
            mime_type: Some("image/png".into()),
            payload_b64: STANDARD.encode([2u8; 16]),
        }
    );
}

#[tokio::test]
async fn oversize_file_is_rejected_without_reading() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    cache
        .on_file_selected(
            Some(&MemoryFile::new("ok.pdf", b"ok".to_vec())),
            &mut form,
            Duration::ZERO,
        )
        .await;
    let big = SizedFile::new("big.pdf", MAX_ATTACHMENT_BYTES + 1, Some(b"x"));
    let reads = big.reads.clone();

    let outcome = cache
        .on_file_selected(Some(&big), &mut form, Duration::ZERO)
        .await;

    assert!(matches!(
        outcome,
        FileSelection::Rejected(FileCacheError::TooLarge { size_bytes, limit, .. })
            if size_bytes == MAX_ATTACHMENT_BYTES + 1 && limit == MAX_ATTACHMENT_BYTES
    ));
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert!(cache.attachment().is_none());
    assert_eq!(form.error(FieldId::Attachment), Some(OVERSIZE_MESSAGE));
    assert_eq!(form.attachment_input(), None);
    assert!(!form.progress().visible);
}

#[tokio::test]
async fn file_exactly_at_limit_is_accepted() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    let file = SizedFile::new("edge.pdf", MAX_ATTACHMENT_BYTES, Some(b"edge"));

    let outcome = cache
        .on_file_selected(Some(&file), &mut form, Duration::ZERO)
        .await;

    assert!(matches!(outcome, FileSelection::Cached { .. }));
    assert!(cache.is_ready());
    assert_eq!(form.error_count(), 0);
}

#[tokio::test]
async fn read_failure_clears_cache_and_reports_on_attachment_field() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    cache
        .on_file_selected(
            Some(&MemoryFile::new("ok.pdf", b"ok".to_vec())),
            &mut form,
            Duration::ZERO,
        )
        .await;
    let broken = SizedFile::new("broken.pdf", 10, None);

    let outcome = cache
        .on_file_selected(Some(&broken), &mut form, Duration::ZERO)
        .await;

    assert!(matches!(
        outcome,
        FileSelection::Rejected(FileCacheError::Read { .. })
    ));
    assert!(cache.attachment().is_none());
    assert_eq!(form.error(FieldId::Attachment), Some(READ_FAILED_MESSAGE));
    assert!(!form.progress().visible);
}

#[tokio::test]
async fn empty_selection_clears_cache_and_all_errors() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    cache
        .on_file_selected(
            Some(&MemoryFile::new("ok.pdf", b"ok".to_vec())),
            &mut form,
            Duration::ZERO,
        )
        .await;
    form.show_error(FieldId::ReferenceNumber, "Reference Number is required.");

    let outcome = cache.on_file_selected(None, &mut form, Duration::ZERO).await;

    assert!(matches!(outcome, FileSelection::Cleared));
    assert!(cache.attachment().is_none());
    assert_eq!(form.error_count(), 0);
    assert_eq!(form.progress().shown, 1);
}

#[tokio::test]
async fn selecting_a_file_clears_errors_on_unrelated_fields() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    form.show_error(FieldId::ApplicationDate, "Application Date is required.");
    form.show_error(FieldId::SubmitButton, "Error: Associated Account ID is missing. Cannot proceed.");

    cache
        .on_file_selected(
            Some(&MemoryFile::new("ok.pdf", b"ok".to_vec())),
            &mut form,
            Duration::ZERO,
        )
        .await;

    assert_eq!(form.error_count(), 0);
}

#[tokio::test]
async fn empty_file_is_staged_but_not_ready() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");

    cache
        .on_file_selected(
            Some(&MemoryFile::new("empty.txt", Vec::new())),
            &mut form,
            Duration::ZERO,
        )
        .await;

    assert!(cache.attachment().is_some());
    assert!(!cache.is_ready());
}

#[tokio::test(start_paused = true)]
async fn progress_indicator_stays_up_for_minimum_display() {
    let mut cache = FileCache::new();
    let mut form = FormState::new("Submit");
    let started = tokio::time::Instant::now();

    cache
        .on_file_selected(
            Some(&MemoryFile::new("ok.pdf", b"ok".to_vec())),
            &mut form,
            Duration::from_millis(1000),
        )
        .await;

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert!(!form.progress().visible);
}

#[tokio::test]
async fn local_file_reads_from_disk() {
    let path = std::env::temp_dir().join(format!(
        "widget_core_local_file_{}.txt",
        std::process::id()
    ));
    tokio::fs::write(&path, b"hello").await.expect("write");

    let file = LocalFile::open(&path).await.expect("open");
    assert_eq!(file.size(), 5);
    assert_eq!(file.mime_type().as_deref(), Some("text/plain"));
    assert_eq!(file.read_all().await.expect("read"), b"hello");

    tokio::fs::remove_file(&path).await.expect("cleanup");
}

#[tokio::test]
async fn local_file_rejects_missing_path() {
    let path = std::env::temp_dir().join("widget_core_missing_file_does_not_exist.bin");
    assert!(LocalFile::open(&path).await.is_err());
}

#[test]
fn data_url_payload_splits_on_first_comma_only() {
    assert_eq!(data_url_payload("data:text/plain;base64,aGk="), "aGk=");
    assert_eq!(data_url_payload("data:x;base64,a,b"), "a,b");
    assert_eq!(data_url_payload("no-comma"), "");
    assert_eq!(
        encode_data_url(None, b"hi"),
        "data:application/octet-stream;base64,aGk="
    );
}
