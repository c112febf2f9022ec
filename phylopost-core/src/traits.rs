//! Small contracts shared by the phylopost crates.

/// Something thresholded or ranked by a single number, such as a p-value.
pub trait Scored {
    fn score(&self) -> f64;
}

/// Something that knows where it came from.
pub trait Annotated {
    /// Source label, usually the path of the file it was read from.
    fn name(&self) -> &str;

    /// Extra detail shown next to the name in reports.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// One-line rendering for logs and command-line output.
pub trait Summarizable {
    fn summary(&self) -> String;
}
