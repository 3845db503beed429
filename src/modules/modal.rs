use crate::modules::types::PgnDescriptor;

/// Message-metadata dialog. Contents are replaced as a unit, so a failed
/// lookup never leaves a half-filled dialog behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnModal {
    pub title: String,
    pub pgn: String,
    pub category: String,
    pub frame_type: Option<String>,
    pub fields: Vec<String>,
    open: bool,
}

impl PgnModal {
    pub fn show(&mut self, descriptor: &PgnDescriptor) {
        self.title.clone_from(&descriptor.description);
        self.pgn = descriptor.pgn.to_string();
        self.category.clone_from(&descriptor.category);
        self.frame_type = descriptor.frame_type().map(str::to_string);
        self.fields = descriptor
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl std::fmt::Display for PgnModal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  PGN:      {}", self.pgn)?;
        writeln!(f, "  Category: {}", self.category)?;
        if let Some(frame_type) = &self.frame_type {
            writeln!(f, "  Type:     {frame_type}")?;
        }
        writeln!(f, "  Fields:")?;
        for name in &self.fields {
            writeln!(f, "    - {name}")?;
        }
        Ok(())
    }
}
