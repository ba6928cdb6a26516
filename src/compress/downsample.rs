//! Document image downsampler
//!
//! Walks the image XObjects reachable from page resources, re-encodes each
//! unique image once, and repoints every reference to the replacement.
//! Image streams are always indirect objects, so their `ObjectId` is the
//! identity used for de-duplication.

use std::collections::{HashMap, HashSet};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::attempts::CompressionAttempt;
use super::resample::{decode_pdf_image, is_stencil_mask, resample, ResampledImage};
use crate::error::ResampleError;

const RESOURCES: &[u8] = b"Resources";
const XOBJECT: &[u8] = b"XObject";

/// Guards against cycles in malformed page trees
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Counters reported by one downsampling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownsampleStats {
    /// Unique image objects encountered
    pub images_seen: usize,
    /// Unique image objects replaced with a re-encoded stream
    pub images_changed: usize,
}

/// Location of a dictionary: an indirect object plus the keys leading into it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DictPath {
    root: ObjectId,
    keys: Vec<&'static [u8]>,
}

impl DictPath {
    fn object(root: ObjectId) -> Self {
        Self {
            root,
            keys: Vec::new(),
        }
    }

    fn child(&self, key: &'static [u8]) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key);
        Self {
            root: self.root,
            keys,
        }
    }

    fn resolve<'a>(&self, doc: &'a Document) -> Option<&'a Dictionary> {
        let mut dict = doc.get_dictionary(self.root).ok()?;
        for key in &self.keys {
            dict = dict.get(key).and_then(|o| o.as_dict()).ok()?;
        }
        Some(dict)
    }

    fn resolve_mut<'a>(&self, doc: &'a mut Document) -> Option<&'a mut Dictionary> {
        let mut dict = doc
            .get_object_mut(self.root)
            .and_then(|o| o.as_dict_mut())
            .ok()?;
        for key in &self.keys {
            dict = dict.get_mut(key).and_then(|o| o.as_dict_mut()).ok()?;
        }
        Some(dict)
    }
}

/// One `/Name -> image` entry in some XObject dictionary
#[derive(Debug, Clone)]
struct ImageSlot {
    owner: DictPath,
    name: Vec<u8>,
    image_id: ObjectId,
}

/// Re-encode every page-level image at `attempt` and prune orphaned objects.
///
/// Per-image failures leave that image untouched; the pass never aborts.
pub fn downsample_all_images(
    doc: &mut Document,
    attempt: CompressionAttempt,
    min_dimension: u32,
) -> DownsampleStats {
    let slots = collect_image_slots(doc);
    let mut replacements: HashMap<ObjectId, Option<ObjectId>> = HashMap::new();

    for slot in &slots {
        let replacement = match replacements.get(&slot.image_id) {
            Some(replacement) => *replacement,
            None => {
                let replacement = match replace_image(doc, slot.image_id, attempt, min_dimension) {
                    Ok(Some(stream)) => Some(doc.add_object(stream)),
                    Ok(None) => None,
                    Err(e) => {
                        log::debug!("Leaving image {:?} untouched: {}", slot.image_id, e);
                        None
                    }
                };
                replacements.insert(slot.image_id, replacement);
                replacement
            }
        };

        if let Some(new_id) = replacement {
            match slot.owner.resolve_mut(doc) {
                Some(xobjects) => xobjects.set(slot.name.clone(), Object::Reference(new_id)),
                None => log::warn!("XObject dictionary for {:?} disappeared", slot.image_id),
            }
        }
    }

    let stats = DownsampleStats {
        images_seen: replacements.len(),
        images_changed: replacements.values().filter(|r| r.is_some()).count(),
    };

    if stats.images_changed > 0 {
        let pruned = doc.prune_objects();
        log::debug!("Pruned {} orphaned objects", pruned.len());
    }

    log::debug!(
        "Downsampled {}/{} images at scale {} quality {}",
        stats.images_changed,
        stats.images_seen,
        attempt.scale,
        attempt.quality
    );

    stats
}

/// Build the replacement stream for one image, or `None` to keep the original
fn replace_image(
    doc: &Document,
    image_id: ObjectId,
    attempt: CompressionAttempt,
    min_dimension: u32,
) -> Result<Option<Stream>, ResampleError> {
    let stream = match doc.get_object(image_id) {
        Ok(Object::Stream(stream)) => stream,
        _ => return Ok(None),
    };

    if is_stencil_mask(&stream.dict) {
        return Ok(None);
    }

    let image = decode_pdf_image(doc, stream)?;
    let Some(resampled) = resample(&image, attempt.scale, attempt.quality, min_dimension)? else {
        return Ok(None);
    };

    // Keep the original when re-encoding would not shrink it
    if resampled.data.len() >= stream.content.len() {
        log::debug!(
            "Re-encoded image {:?} is not smaller ({} >= {} bytes)",
            image_id,
            resampled.data.len(),
            stream.content.len()
        );
        return Ok(None);
    }

    Ok(Some(image_stream(&stream.dict, resampled)))
}

/// Image XObject for a JPEG payload, carrying over masks from `source`
fn image_stream(source: &Dictionary, image: ResampledImage) -> Stream {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => image.color_space.pdf_name(),
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };

    for key in [b"SMask".as_slice(), b"Mask".as_slice()] {
        if let Ok(Object::Reference(id)) = source.get(key) {
            dict.set(key.to_vec(), Object::Reference(*id));
        }
    }
    if let Ok(interpolate) = source.get(b"Interpolate") {
        dict.set("Interpolate", interpolate.clone());
    }

    Stream::new(dict, image.data).with_compression(false)
}

/// Every image entry of every page's XObject dictionary, in page order
fn collect_image_slots(doc: &Document) -> Vec<ImageSlot> {
    let mut slots = Vec::new();
    let mut visited = HashSet::new();

    for page_id in doc.get_pages().into_values() {
        let Some(xobjects) = resources_path(doc, page_id).and_then(|r| xobject_path(doc, &r))
        else {
            continue;
        };

        // Pages sharing one XObject dictionary only need it rewritten once
        if !visited.insert(xobjects.clone()) {
            continue;
        }

        let Some(dict) = xobjects.resolve(doc) else {
            continue;
        };

        for (name, value) in dict.iter() {
            let Ok(image_id) = value.as_reference() else {
                continue;
            };
            if is_image(doc, image_id) {
                slots.push(ImageSlot {
                    owner: xobjects.clone(),
                    name: name.clone(),
                    image_id,
                });
            }
        }
    }

    slots
}

/// Resources of a page, inherited from ancestors when the page has none
fn resources_path(doc: &Document, page_id: ObjectId) -> Option<DictPath> {
    let mut node_id = page_id;

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        match node.get(RESOURCES) {
            Ok(Object::Reference(id)) => return Some(DictPath::object(*id)),
            Ok(Object::Dictionary(_)) => return Some(DictPath::object(node_id).child(RESOURCES)),
            _ => {}
        }
        node_id = node.get(b"Parent").and_then(|o| o.as_reference()).ok()?;
    }

    None
}

fn xobject_path(doc: &Document, resources: &DictPath) -> Option<DictPath> {
    match resources.resolve(doc)?.get(XOBJECT) {
        Ok(Object::Reference(id)) => Some(DictPath::object(*id)),
        Ok(Object::Dictionary(_)) => Some(resources.child(XOBJECT)),
        _ => None,
    }
}

fn is_image(doc: &Document, id: ObjectId) -> bool {
    match doc.get_object(id) {
        Ok(Object::Stream(stream)) => matches!(
            stream.dict.get(b"Subtype").and_then(|o| o.as_name()),
            Ok(name) if name == b"Image"
        ),
        _ => false,
    }
}
