use std::cell::Cell;
use std::collections::HashSet;
use std::fs;
use std::rc::Rc;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use pdf_squeeze::compress::structural_pass;
use pdf_squeeze::config::defaults::BYTES_PER_MB;
use pdf_squeeze::{
    CompressError, DocumentHandle, ExternalCompressor, ExternalOutcome, PdfCompressor, Settings,
    Stage,
};

/// Gradient with per-pixel noise: compresses poorly with Flate, well with JPEG
fn noisy_rgb(width: i64, height: i64, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let noise = ((state >> 24) as u8) / 4;
            data.push((x * 191 / width) as u8 + noise);
            data.push((y * 191 / height) as u8 + noise);
            data.push(((x + y) * 95 / (width + height)) as u8 + noise);
        }
    }
    data
}

fn add_image(doc: &mut Document, width: i64, height: i64, seed: u32) -> ObjectId {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    doc.add_object(Stream::new(dict, noisy_rgb(width, height, seed)))
}

/// One page per entry, each drawing the listed images
fn assemble(mut doc: Document, pages_id: ObjectId, page_images: &[Vec<ObjectId>]) -> Vec<u8> {
    let mut kids = Vec::new();

    for images in page_images {
        let mut xobjects = Dictionary::new();
        let mut ops = String::from("BT /F1 12 Tf 72 720 Td (Scanned page) Tj ET\n");
        for (i, id) in images.iter().enumerate() {
            let name = format!("Im{}", i);
            ops.push_str(&format!("q 400 0 0 300 72 {} cm /{} Do Q\n", 72 + i * 10, name));
            xobjects.set(name, Object::Reference(*id));
        }

        let content = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("Failed to save test PDF");
    output
}

fn pdf_with_images(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let pages: Vec<Vec<ObjectId>> = sizes
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| vec![add_image(&mut doc, w, h, i as u32 + 1)])
        .collect();
    assemble(doc, pages_id, &pages)
}

fn pdf_with_shared_image(page_count: usize, width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image = add_image(&mut doc, width, height, 42);
    assemble(doc, pages_id, &vec![vec![image]; page_count])
}

fn text_only_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    assemble(doc, pages_id, &[Vec::new(), Vec::new()])
}

fn image_dimensions(doc: &Document) -> Vec<(ObjectId, i64, i64)> {
    doc.objects
        .iter()
        .filter_map(|(id, object)| {
            let stream = object.as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").and_then(|o| o.as_name()).ok()?;
            if subtype != b"Image" {
                return None;
            }
            let width = stream.dict.get(b"Width").and_then(|o| o.as_i64()).ok()?;
            let height = stream.dict.get(b"Height").and_then(|o| o.as_i64()).ok()?;
            Some((*id, width, height))
        })
        .collect()
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// External compressor double that records calls and returns a fixed outcome
struct FakeExternal {
    outcome: ExternalOutcome,
    calls: Rc<Cell<usize>>,
}

impl FakeExternal {
    fn boxed(outcome: ExternalOutcome) -> (Box<dyn ExternalCompressor>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let fake = FakeExternal {
            outcome,
            calls: Rc::clone(&calls),
        };
        (Box::new(fake), calls)
    }
}

impl ExternalCompressor for FakeExternal {
    fn name(&self) -> &str {
        "fake"
    }

    fn compress(&self, _input: &[u8], _target_size: u64) -> ExternalOutcome {
        self.calls.set(self.calls.get() + 1);
        self.outcome.clone()
    }
}

fn in_process_only() -> PdfCompressor {
    PdfCompressor::new(Settings::default()).without_external()
}

#[test]
fn test_structural_pass_is_idempotent() {
    let original = pdf_with_images(&[(120, 90)]);

    let first = structural_pass(&original).expect("First structural pass failed");
    let second = structural_pass(&first).expect("Second structural pass failed");

    assert!(second.len() <= first.len());
    assert!(Document::load_mem(&second).is_ok());
}

#[test]
fn test_never_grows_text_only_document() {
    let original = text_only_pdf();
    let result = in_process_only()
        .compress(&DocumentHandle::Bytes(original.clone()), None)
        .expect("Compression failed");

    assert!(result.size <= original.len() as u64);
    assert_eq!(result.size, result.data.len() as u64);
    assert_eq!(result.original_size, original.len() as u64);
}

#[test]
fn test_structural_success_skips_lossy_passes() {
    let original = pdf_with_images(&[(200, 150)]);
    let (external, calls) = FakeExternal::boxed(ExternalOutcome::Unavailable);
    let compressor = PdfCompressor::new(Settings::default()).with_external(external);

    // Far above the document size, so the structural pass already fits
    let result = compressor
        .compress(&DocumentHandle::Bytes(original.clone()), Some(100.0))
        .expect("Compression failed");

    assert_eq!(calls.get(), 0);
    assert_eq!(result.attempts_run, 0);
    assert!(matches!(result.stage, Stage::Original | Stage::Structural));
    assert!(result.met_target());

    // No image was re-encoded
    let doc = Document::load_mem(&result.data).unwrap();
    assert!(image_dimensions(&doc)
        .iter()
        .all(|&(_, w, h)| (w, h) == (200, 150)));
}

#[test]
fn test_large_scans_without_external_tool() {
    let sizes = [(400, 300), (400, 300), (400, 300)];
    let original = pdf_with_images(&sizes);
    let (external, calls) = FakeExternal::boxed(ExternalOutcome::Unavailable);
    let compressor = PdfCompressor::new(Settings::default()).with_external(external);

    let target = original.len() as u64 / 5;
    let result = compressor
        .compress(&DocumentHandle::Bytes(original.clone()), Some(mb(target)))
        .expect("Compression failed");

    assert_eq!(calls.get(), 1);
    assert!(result.attempts_run >= 1);
    assert!(result.attempts_run <= 22);
    assert!(result.size < original.len() as u64);
    assert!(matches!(result.stage, Stage::Downsampled { .. }));

    let doc = Document::load_mem(&result.data).expect("Result is not a valid PDF");
    assert_eq!(doc.get_pages().len(), 3);
    let images = image_dimensions(&doc);
    assert_eq!(images.len(), 3);
    for (_, width, height) in images {
        assert!(width <= 400 && height <= 300);
    }
}

#[test]
fn test_unreachable_target_returns_best_effort() {
    let original = pdf_with_images(&[(300, 200), (160, 120)]);
    let compressor = in_process_only();

    // 1 byte can never be met; the walk starts at the aggressive offset
    let result = compressor
        .compress(&DocumentHandle::Bytes(original.clone()), Some(1.0 / BYTES_PER_MB))
        .expect("Compression failed");

    let settings = compressor.settings();
    assert_eq!(result.target_size, 1);
    assert!(!result.met_target());
    assert_eq!(
        result.attempts_run,
        settings.attempts.len() - settings.start_heuristic.aggressive_start
    );
    assert!(result.size < original.len() as u64);
    assert!(Document::load_mem(&result.data).is_ok());
}

#[test]
fn test_shared_image_stays_shared() {
    let original = pdf_with_shared_image(5, 240, 180);
    let result = in_process_only()
        .compress(&DocumentHandle::Bytes(original.clone()), Some(1.0 / BYTES_PER_MB))
        .expect("Compression failed");

    let doc = Document::load_mem(&result.data).unwrap();
    let images = image_dimensions(&doc);
    assert_eq!(images.len(), 1);

    let referenced: HashSet<ObjectId> = doc
        .get_pages()
        .into_values()
        .map(|page_id| {
            doc.get_dictionary(page_id)
                .unwrap()
                .get(b"Resources")
                .and_then(|o| o.as_dict())
                .and_then(|r| r.get(b"XObject"))
                .and_then(|o| o.as_dict())
                .and_then(|x| x.get(b"Im0"))
                .and_then(|o| o.as_reference())
                .unwrap()
        })
        .collect();
    assert_eq!(doc.get_pages().len(), 5);
    assert_eq!(referenced.len(), 1);
    assert!(referenced.contains(&images[0].0));
}

#[test]
fn test_external_result_meeting_target_is_returned() {
    let original = pdf_with_images(&[(300, 200)]);
    let small = text_only_pdf();
    assert!(small.len() < original.len() / 4);

    let (external, calls) = FakeExternal::boxed(ExternalOutcome::Compressed {
        data: small.clone(),
        dpi: 150,
    });
    let compressor = PdfCompressor::new(Settings::default()).with_external(external);

    let target = small.len() as u64 + 16;
    let result = compressor
        .compress(&DocumentHandle::Bytes(original), Some(mb(target)))
        .expect("Compression failed");

    assert_eq!(calls.get(), 1);
    assert_eq!(result.stage, Stage::External { dpi: 150 });
    assert_eq!(result.data, small);
    assert_eq!(result.attempts_run, 0);
}

#[test]
fn test_larger_external_result_is_ignored() {
    let original = pdf_with_images(&[(300, 200)]);
    let mut bloated = original.clone();
    bloated.extend_from_slice(&[b' '; 4096]);

    let (external, calls) = FakeExternal::boxed(ExternalOutcome::Compressed {
        data: bloated,
        dpi: 72,
    });
    let compressor = PdfCompressor::new(Settings::default()).with_external(external);

    let result = compressor
        .compress(&DocumentHandle::Bytes(original.clone()), Some(1.0 / BYTES_PER_MB))
        .expect("Compression failed");

    assert_eq!(calls.get(), 1);
    assert!(!matches!(result.stage, Stage::External { .. }));
    assert!(result.size < original.len() as u64);
}

#[test]
fn test_external_failure_falls_back() {
    let original = pdf_with_images(&[(300, 200)]);
    let (external, calls) =
        FakeExternal::boxed(ExternalOutcome::Failed("exit status 1".to_string()));
    let compressor = PdfCompressor::new(Settings::default()).with_external(external);

    let target = original.len() as u64 / 4;
    let result = compressor
        .compress(&DocumentHandle::Bytes(original.clone()), Some(mb(target)))
        .expect("Compression failed");

    assert_eq!(calls.get(), 1);
    assert!(result.attempts_run > 0);
    assert!(result.size < original.len() as u64);
}

#[test]
fn test_path_and_bytes_handles_agree() {
    let original = pdf_with_images(&[(200, 150)]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    fs::write(&path, &original).unwrap();

    let compressor = in_process_only();
    let from_path = compressor
        .compress(&DocumentHandle::from_path(&path), None)
        .expect("Compression from path failed");
    let from_bytes = compressor
        .compress(&DocumentHandle::Bytes(original), None)
        .expect("Compression from bytes failed");

    assert_eq!(from_path.original_size, from_bytes.original_size);
    assert_eq!(from_path.target_size, from_bytes.target_size);
    assert_eq!(from_path.size, from_bytes.size);
}

#[test]
fn test_default_target_is_three_quarters_of_original() {
    let original = pdf_with_images(&[(200, 150)]);
    let result = in_process_only()
        .compress(&DocumentHandle::Bytes(original.clone()), None)
        .expect("Compression failed");

    assert_eq!(result.target_size, original.len() as u64 * 3 / 4);
}

#[test]
fn test_unreadable_input_is_an_error() {
    let result =
        in_process_only().compress(&DocumentHandle::Bytes(b"%PDF-1.4 garbage".to_vec()), None);
    assert!(matches!(result, Err(CompressError::Load(_))));

    let missing =
        in_process_only().compress(&DocumentHandle::from_path("/nonexistent/in.pdf"), None);
    assert!(matches!(missing, Err(CompressError::Io(_))));
}
