//! Readership academic-status vocabulary, folded into a handful of buckets.

pub const JOB_TITLES: &[(&str, &str)] = &[
    ("Librarian", "Librarian"),
    ("Student  > Bachelor", "Undergrad Student"),
    ("Student (Bachelor)", "Undergrad Student"),
    ("Student (Master)", "Masters Student"),
    ("Student (Postgraduate)", "Masters Student"),
    ("Student  > Master", "Masters Student"),
    ("Student  > Postgraduate", "Masters Student"),
    ("Doctoral Student", "PhD Student"),
    ("Ph.D. Student", "PhD Student"),
    ("Student  > Doctoral Student", "PhD Student"),
    ("Student  > Ph. D. Student", "PhD Student"),
    ("Post Doc", "Postdoc"),
    ("Professor", "Faculty"),
    ("Associate Professor", "Faculty"),
    ("Assistant Professor", "Faculty"),
    ("Professor > Associate Professor", "Faculty"),
    ("Professor > Assistant Professor", "Faculty"),
    ("Senior Lecturer", "Faculty"),
    ("Lecturer > Senior Lecturer", "Faculty"),
    ("Lecturer", "Faculty"),
    ("Researcher (at an Academic Institution)", "Faculty"),
    ("Researcher (at a non-Academic Institution)", "Researcher (non-academic)"),
    ("Other Professional", "Other"),
];

/// Bucket for a raw academic-status label. Unmapped labels pass through.
pub fn standardize_job_title(raw: &str) -> &str {
    JOB_TITLES
        .iter()
        .find(|(label, _)| *label == raw)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(raw)
}
