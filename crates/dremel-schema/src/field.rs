//! Leaf field identities: dot-segmented paths plus cardinality modes.
//!
//! A [`FieldPath`] with zero segments is the root. It is the ancestor of every
//! other path and stands in for "no field" wherever a previous field has not
//! been visited yet.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::SchemaError;

/// Cardinality of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum Mode {
    /// Exactly one value per parent instance.
    #[default]
    Required,
    /// Zero or one value per parent instance.
    Optional,
    /// Zero or more values per parent instance.
    Repeated,
}

impl Mode {
    /// The lowercase name used in schema files.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Required => "required",
            Mode::Optional => "optional",
            Mode::Repeated => "repeated",
        }
    }

    /// Whether a node in this mode contributes a definition level.
    pub fn is_nullable(self) -> bool {
        !matches!(self, Mode::Required)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(Mode::Required),
            "optional" => Ok(Mode::Optional),
            "repeated" => Ok(Mode::Repeated),
            other => Err(SchemaError::UnknownMode(other.to_string())),
        }
    }
}

/// An ordered list of path segments, e.g. `Name.Language.Code`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The root path (no segments).
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    /// Build a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path. Empty segments are dropped, so `""` is the root.
    pub fn parse(dotted: &str) -> Self {
        FieldPath::new(dotted.split('.').filter(|segment| !segment.is_empty()))
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The ancestor made of the first `depth` segments (clamped to this path).
    pub fn prefix(&self, depth: usize) -> FieldPath {
        FieldPath(self.0[..depth.min(self.0.len())].to_vec())
    }

    /// A child path with one more segment.
    pub fn child(&self, segment: impl Into<String>) -> FieldPath {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        FieldPath(segments)
    }

    /// Whether `self` is a (non-strict) prefix of `other`.
    pub fn is_ancestor_of(&self, other: &FieldPath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Number of leading segments shared with `other`.
    pub fn common_depth(&self, other: &FieldPath) -> usize {
        self.0
            .iter()
            .zip(&other.0)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// The longest common segment prefix of the two paths.
    pub fn lowest_common_ancestor(&self, other: &FieldPath) -> FieldPath {
        self.prefix(self.common_depth(other))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        FieldPath::parse(dotted)
    }
}

/// A leaf field of a flattened schema.
///
/// Identity is the path alone: two fields with the same path compare equal
/// and hash the same regardless of modes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Field {
    path: FieldPath,
    modes: Vec<Mode>,
}

impl Field {
    /// Create a field from its path and the mode of every segment on it.
    ///
    /// The last mode is the mode of the leaf itself.
    pub fn new(path: FieldPath, modes: Vec<Mode>) -> Result<Self, SchemaError> {
        if path.is_root() {
            return Err(SchemaError::EmptyPath);
        }
        if path.depth() != modes.len() {
            return Err(SchemaError::ModeCountMismatch {
                path,
                modes: modes.len(),
            });
        }
        if path.depth() > usize::from(u8::MAX) {
            return Err(SchemaError::TooDeep { path });
        }
        Ok(Field { path, modes })
    }

    /// Shorthand for a single-segment field.
    pub fn top_level(name: impl Into<String>, mode: Mode) -> Result<Self, SchemaError> {
        Field::new(FieldPath::new([name.into()]), vec![mode])
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Mode of the leaf.
    pub fn mode(&self) -> Mode {
        // `new` rejects empty paths, so there is always a last mode.
        self.modes.last().copied().unwrap_or_default()
    }

    /// Mode of every segment, root-most first.
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn max_repetition_level(&self) -> u8 {
        count_levels(&self.modes, |mode| mode == Mode::Repeated)
    }

    pub fn max_definition_level(&self) -> u8 {
        count_levels(&self.modes, Mode::is_nullable)
    }

    /// Number of repeated segments on the path prefix shared with `other`.
    pub fn common_repetition_level(&self, other: &Field) -> u8 {
        let shared = self.path.common_depth(&other.path);
        count_levels(&self.modes[..shared], |mode| mode == Mode::Repeated)
    }

    /// Depth (1-based) of the repeated segment that owns repetition level
    /// `level`, or `None` for level 0 and levels above the maximum.
    pub fn repetition_depth(&self, level: u8) -> Option<usize> {
        if level == 0 {
            return None;
        }
        self.modes
            .iter()
            .enumerate()
            .filter(|(_, mode)| **mode == Mode::Repeated)
            .nth(usize::from(level) - 1)
            .map(|(index, _)| index + 1)
    }

    /// How many leading group segments exist for a cell with the given
    /// definition level. The leaf segment itself is never counted.
    pub fn present_depth(&self, definition_level: u8) -> usize {
        let groups = &self.modes[..self.modes.len() - 1];
        let mut defined = 0u8;
        let mut depth = 0;
        for mode in groups {
            if mode.is_nullable() {
                defined += 1;
            }
            if defined > definition_level {
                break;
            }
            depth += 1;
        }
        depth
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.mode())
    }
}

fn count_levels(modes: &[Mode], counts: impl Fn(Mode) -> bool) -> u8 {
    // Paths deeper than u8::MAX are rejected in `Field::new`.
    modes.iter().filter(|mode| counts(**mode)).count() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn field(dotted: &str, modes: &[Mode]) -> Field {
        Field::new(FieldPath::parse(dotted), modes.to_vec()).unwrap()
    }

    fn code() -> Field {
        field(
            "Name.Language.Code",
            &[Mode::Repeated, Mode::Repeated, Mode::Required],
        )
    }

    #[test]
    fn test_parse_and_display() {
        let path = FieldPath::parse("a.b.c");
        assert_eq!(path.depth(), 3);
        assert_eq!(path.to_string(), "a.b.c");
        assert_eq!(path.name(), Some("c"));
        assert!(FieldPath::parse("").is_root());
        assert_eq!(FieldPath::root().to_string(), "<root>");
    }

    #[test]
    fn test_lowest_common_ancestor() {
        let a = FieldPath::parse("Name.Language.Code");
        let b = FieldPath::parse("Name.Url");
        assert_eq!(a.lowest_common_ancestor(&b), FieldPath::parse("Name"));
        assert_eq!(a.lowest_common_ancestor(&a), a);
        assert_eq!(
            a.lowest_common_ancestor(&FieldPath::parse("DocId")),
            FieldPath::root()
        );
        assert_eq!(a.lowest_common_ancestor(&FieldPath::root()), FieldPath::root());
    }

    #[test]
    fn test_lca_never_deeper_than_inputs() {
        let paths = ["a", "a.b", "a.b.c", "a.x", "b.x", ""];
        for left in paths {
            for right in paths {
                let (left, right) = (FieldPath::parse(left), FieldPath::parse(right));
                let lca = left.lowest_common_ancestor(&right);
                assert!(lca.depth() <= left.depth().min(right.depth()));
                assert!(lca.is_ancestor_of(&left));
                assert!(lca.is_ancestor_of(&right));
            }
        }
    }

    #[test]
    fn test_identity_is_path_based() {
        let a = field("a.b", &[Mode::Optional, Mode::Required]);
        let b = field("a.b", &[Mode::Repeated, Mode::Repeated]);
        assert_eq!(a, b);
        assert_ne!(a, field("a.c", &[Mode::Optional, Mode::Required]));
    }

    #[test]
    fn test_levels() {
        let code = code();
        assert_eq!(code.mode(), Mode::Required);
        assert_eq!(code.max_repetition_level(), 2);
        assert_eq!(code.max_definition_level(), 2);

        let country = field(
            "Name.Language.Country",
            &[Mode::Repeated, Mode::Repeated, Mode::Optional],
        );
        assert_eq!(country.max_definition_level(), 3);
        assert_eq!(code.common_repetition_level(&country), 2);

        let url = field("Name.Url", &[Mode::Repeated, Mode::Optional]);
        assert_eq!(code.common_repetition_level(&url), 1);
    }

    #[test]
    fn test_repetition_depth() {
        let code = code();
        assert_eq!(code.repetition_depth(0), None);
        assert_eq!(code.repetition_depth(1), Some(1));
        assert_eq!(code.repetition_depth(2), Some(2));
        assert_eq!(code.repetition_depth(3), None);

        let forward = field("Links.Forward", &[Mode::Optional, Mode::Repeated]);
        assert_eq!(forward.repetition_depth(1), Some(2));
    }

    #[test]
    fn test_present_depth() {
        let code = code();
        assert_eq!(code.present_depth(0), 0);
        assert_eq!(code.present_depth(1), 1);
        assert_eq!(code.present_depth(2), 2);

        let nested = field(
            "a.b.c",
            &[Mode::Optional, Mode::Required, Mode::Optional],
        );
        assert_eq!(nested.present_depth(0), 0);
        assert_eq!(nested.present_depth(1), 2);
    }

    #[test]
    fn test_rejects_bad_fields() {
        assert_eq!(
            Field::new(FieldPath::root(), vec![]),
            Err(SchemaError::EmptyPath)
        );
        assert!(matches!(
            Field::new(FieldPath::parse("a.b"), vec![Mode::Required]),
            Err(SchemaError::ModeCountMismatch { modes: 1, .. })
        ));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("repeated".parse::<Mode>(), Ok(Mode::Repeated));
        assert_eq!(
            "sometimes".parse::<Mode>(),
            Err(SchemaError::UnknownMode("sometimes".to_string()))
        );
    }
}
