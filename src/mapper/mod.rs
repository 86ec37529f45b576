//! Native CMS article → image-set mapping pipeline.
//!
//! ```text
//! bytes ─▶ native::decode ─▶ article::parse ─┐
//!                         └▶ attributes::parse ┴▶ assemble::assemble ─▶ [ImageSet]
//! ```
//!
//! Every stage is a pure function; [`ImageSetMapper`] runs them in order and
//! tags the first failure with the stage it came from.
use tracing::{debug, warn};

use crate::error::{Stage, TransformError};
use crate::model::{ImageSet, NativeContent};

pub mod article;
pub mod assemble;
pub mod attributes;
pub mod identifier;
pub mod native;
mod xml;

/// Native type of the articles whose image-sets are mapped.
pub const COMPOUND_STORY: &str = "EOM::CompoundStory";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSetMapper;

impl ImageSetMapper {
    pub fn new() -> Self {
        Self
    }

    /// Decode a raw native envelope and map it.
    pub fn transform(
        &self,
        source: &[u8],
        last_modified: &str,
        publish_reference: &str,
    ) -> Result<Vec<ImageSet>, TransformError> {
        let native = native::decode(source).map_err(|err| TransformError::new(Stage::Decode, err))?;
        self.map_native(&native, last_modified, publish_reference)
    }

    /// Map an already decoded envelope.
    pub fn map_native(
        &self,
        native: &NativeContent,
        last_modified: &str,
        publish_reference: &str,
    ) -> Result<Vec<ImageSet>, TransformError> {
        let body = native
            .body()
            .map_err(|err| TransformError::new(Stage::Decode, err))?;
        let raw_sets =
            article::parse(&body).map_err(|err| TransformError::new(Stage::ParseBody, err))?;
        let attributes = attributes::parse(&native.attributes)
            .map_err(|err| TransformError::new(Stage::ParseAttributes, err))?;
        let image_sets =
            assemble::assemble(&raw_sets, &attributes, last_modified, publish_reference)
                .map_err(|err| TransformError::new(Stage::Assemble, err))?;

        if image_sets.is_empty() {
            warn!(
                uuid = %native.source_id,
                transaction_id = publish_reference,
                "no image-sets found in article body"
            );
        } else {
            debug!(
                uuid = %native.source_id,
                transaction_id = publish_reference,
                count = image_sets.len(),
                "mapped image-sets"
            );
        }
        Ok(image_sets)
    }
}
