use std::collections::BTreeSet;
use std::fmt;

/// Kind of a configured or discovered source, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A paginated collection page (`<host>/c/<id>/...`).
    Collection,
    /// A single-page sale (`<host>/s/<id>/...`).
    Sale,
    /// A discussion thread (`<host>/r/<sub>/comments/<id>/...`).
    Thread,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Collection => "collection",
            SourceKind::Sale => "sale",
            SourceKind::Thread => "thread",
        };
        f.write_str(s)
    }
}

/// Terminal state of a listing in the resolved partition.
///
/// `DlOnlyOld` and `Downloaded` are never produced by the classifier; the
/// operator moves listings into them by editing the history file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Claimed,
    DlOnly,
    DlOnlyOld,
    AlwaysFree,
    Web,
    Buy,
    Removed,
    Downloaded,
}

impl Classification {
    pub const ALL: [Classification; 8] = [
        Classification::Claimed,
        Classification::DlOnly,
        Classification::DlOnlyOld,
        Classification::AlwaysFree,
        Classification::Web,
        Classification::Buy,
        Classification::Removed,
        Classification::Downloaded,
    ];

    /// Key used for this category in the persisted history.
    pub fn key(&self) -> &'static str {
        match self {
            Classification::Claimed => "claimed",
            Classification::DlOnly => "dl_only",
            Classification::DlOnlyOld => "dl_only_old",
            Classification::AlwaysFree => "always_free",
            Classification::Web => "web",
            Classification::Buy => "buy",
            Classification::Removed => "removed",
            Classification::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Result of classifying one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub classification: Classification,
    /// The listing is tied to another active promotion worth traversing.
    pub has_more: bool,
}

impl Outcome {
    pub fn new(classification: Classification) -> Self {
        Self {
            classification,
            has_more: false,
        }
    }

    pub fn with_more(classification: Classification) -> Self {
        Self {
            classification,
            has_more: true,
        }
    }
}

impl From<Classification> for Outcome {
    fn from(classification: Classification) -> Self {
        Outcome::new(classification)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_more {
            write!(f, "{} (has more)", self.classification)
        } else {
            write!(f, "{}", self.classification)
        }
    }
}

/// Listing and group URLs harvested from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Harvest {
    pub listings: BTreeSet<String>,
    /// URLs flagged as connected to further groups.
    pub more: BTreeSet<String>,
}

impl Harvest {
    pub fn merge(&mut self, other: Harvest) {
        self.listings.extend(other.listings);
        self.more.extend(other.more);
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty() && self.more.is_empty()
    }
}
