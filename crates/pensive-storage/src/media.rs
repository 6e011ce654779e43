use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Image,
    Audio,
    Video,
    None,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a file by the top-level type of its guessed MIME type. Anything
/// that is not text, image, audio or video is [`MediaKind::None`].
pub fn media_kind(filename: &str) -> MediaKind {
    let Some(mime) = mime_guess::from_path(filename).first() else {
        return MediaKind::None;
    };
    match mime.type_().as_str() {
        "text" => MediaKind::Text,
        "image" => MediaKind::Image,
        "audio" => MediaKind::Audio,
        "video" => MediaKind::Video,
        _ => MediaKind::None,
    }
}

/// MIME type for a file name, or `"none"` when the extension is unknown.
pub fn content_type(filename: &str) -> &'static str {
    mime_guess::from_path(filename).first_raw().unwrap_or("none")
}
