use bytes::Bytes;

use crate::error::ValidationError;

pub const MAX_CONTENT_CHARS: usize = 1000;
pub const MAX_IMAGES: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime: String,
    pub data: Bytes,
}

impl ImageAttachment {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    fn check(&self) -> Result<(), ValidationError> {
        if !self.mime.starts_with("image/") {
            return Err(ValidationError::NotAnImage {
                file_name: self.file_name.clone(),
            });
        }
        if self.data.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                file_name: self.file_name.clone(),
                size: self.data.len(),
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(())
    }
}

/// Submission form state. Images are checked as they are added, content on submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionDraft {
    pub content: String,
    images: Vec<ImageAttachment>,
}

impl SubmissionDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn images(&self) -> &[ImageAttachment] {
        &self.images
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn can_add_images(&self) -> bool {
        self.images.len() < MAX_IMAGES
    }

    /// Adds a batch of images, all or nothing.
    pub fn add_images(&mut self, batch: Vec<ImageAttachment>) -> Result<(), ValidationError> {
        let count = self.images.len() + batch.len();
        if count > MAX_IMAGES {
            return Err(ValidationError::TooManyImages {
                count,
                max: MAX_IMAGES,
            });
        }
        for image in &batch {
            image.check()?;
        }
        self.images.extend(batch);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageAttachment> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.images.clear();
    }

    /// Full check run right before submitting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_submission(&self.content, &self.images)
    }
}

pub fn validate_submission(content: &str, images: &[ImageAttachment]) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let len = content.chars().count();
    if len > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_CONTENT_CHARS,
        });
    }
    if images.len() > MAX_IMAGES {
        return Err(ValidationError::TooManyImages {
            count: images.len(),
            max: MAX_IMAGES,
        });
    }
    images.iter().try_for_each(ImageAttachment::check)
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> ImageAttachment {
        ImageAttachment::new(name, "image/png", vec![0u8; 16])
    }

    #[test]
    fn blank_content_is_rejected() {
        assert_eq!(
            SubmissionDraft::new("   \n").validate(),
            Err(ValidationError::EmptyContent)
        );
    }

    #[test]
    fn length_limit_counts_characters() {
        let at_limit = "é".repeat(MAX_CONTENT_CHARS);
        assert!(SubmissionDraft::new(at_limit).validate().is_ok());

        let over = "a".repeat(MAX_CONTENT_CHARS + 1);
        assert_eq!(
            SubmissionDraft::new(over).validate(),
            Err(ValidationError::ContentTooLong {
                len: 1001,
                max: 1000
            })
        );
    }

    #[test]
    fn image_batch_is_all_or_nothing() {
        let mut draft = SubmissionDraft::new("hi");
        draft
            .add_images((0..4).map(|i| png(&format!("{i}.png"))).collect())
            .unwrap();
        let err = draft
            .add_images(vec![png("a.png"), png("b.png")])
            .unwrap_err();
        assert_eq!(err, ValidationError::TooManyImages { count: 6, max: 5 });
        assert_eq!(draft.images().len(), 4);

        let err = draft
            .add_images(vec![ImageAttachment::new("notes.txt", "text/plain", "x")])
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotAnImage { .. }));
        assert_eq!(draft.images().len(), 4);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let mut draft = SubmissionDraft::new("hi");
        let big = ImageAttachment::new("big.jpg", "image/jpeg", vec![0u8; MAX_IMAGE_BYTES + 1]);
        assert!(matches!(
            draft.add_images(vec![big]),
            Err(ValidationError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn remove_image_ignores_out_of_range() {
        let mut draft = SubmissionDraft::new("hi");
        draft.add_images(vec![png("a.png"), png("b.png")]).unwrap();
        assert!(draft.remove_image(5).is_none());
        assert_eq!(draft.remove_image(0).unwrap().file_name, "a.png");
        assert_eq!(draft.images()[0].file_name, "b.png");
    }

    #[test]
    fn login_requires_both_fields() {
        assert!(validate_login("", "pw").is_err());
        assert!(validate_login("admin", "").is_err());
        assert!(validate_login("admin", "pw").is_ok());
    }
}
