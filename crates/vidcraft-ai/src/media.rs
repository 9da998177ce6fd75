//! Binary payloads returned by the image and speech backends.

/// Encoded image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
}

impl GeneratedImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// File extension guessed from the leading bytes.
    pub fn extension(&self) -> &'static str {
        match self.data.as_slice() {
            [0xFF, 0xD8, 0xFF, ..] => "jpg",
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
            _ => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension() {
            "jpg" => "image/jpeg",
            "webp" => "image/webp",
            _ => "image/png",
        }
    }
}

/// Encoded audio bytes and their declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl GeneratedAudio {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
        }
    }

    pub fn extension(&self) -> &'static str {
        let declared = self.content_type.split(';').next().unwrap_or("").trim();
        match declared {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/ogg" => "ogg",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            _ => match self.data.as_slice() {
                [b'I', b'D', b'3', ..] | [0xFF, 0xFB, ..] => "mp3",
                [b'O', b'g', b'g', b'S', ..] => "ogg",
                _ => "wav",
            },
        }
    }
}
