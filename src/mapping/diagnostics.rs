//! Diagnostic Engine
//!
//! Walks finalized mappings and extraction issues and reports what the generated code will not
//! cover. Every diagnostic is advisory: generation always proceeds.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::decl::{ExtractionIssue, SourceLocation};
use crate::core::normalize::{FinalizedMapping, MissingReason, PlanValue};

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Advisory, never blocks generation.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Destination member with no binding and no same-named source member.
    CoverageGap { member: String },
    UnknownSourceMember { member: String, source_member: String },
    UnknownDestinationMember { member: String },
    Unconvertible { member: String, source_type: String, destination_type: String },
    UnparsedDeclaration { message: String },
    UnresolvedType { type_name: String },
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::CoverageGap { .. } => "MG0001",
            DiagnosticKind::UnknownSourceMember { .. } => "MG0002",
            DiagnosticKind::UnknownDestinationMember { .. } => "MG0003",
            DiagnosticKind::Unconvertible { .. } => "MG0004",
            DiagnosticKind::UnparsedDeclaration { .. } => "MG0005",
            DiagnosticKind::UnresolvedType { .. } => "MG0006",
        }
    }

    /// Member (or type, or message) the diagnostic is about.
    pub fn subject(&self) -> &str {
        match self {
            DiagnosticKind::CoverageGap { member }
            | DiagnosticKind::UnknownSourceMember { member, .. }
            | DiagnosticKind::UnknownDestinationMember { member }
            | DiagnosticKind::Unconvertible { member, .. } => member,
            DiagnosticKind::UnparsedDeclaration { message } => message,
            DiagnosticKind::UnresolvedType { type_name } => type_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Empty for diagnostics not tied to one mapping.
    pub source: String,
    pub destination: String,
    pub location: Option<SourceLocation>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    //coverage gaps are keyed on (destination, member) only, whatever the source
    fn dedup_key(&self) -> (&'static str, String, String, String) {
        let location = match &self.kind {
            DiagnosticKind::UnparsedDeclaration { .. } => {
                self.location.as_ref().map(ToString::to_string).unwrap_or_default()
            }
            _ => String::new(),
        };
        let source = match &self.kind {
            DiagnosticKind::CoverageGap { .. } => String::new(),
            _ => self.source.clone(),
        };
        (
            self.code(),
            source,
            self.destination.clone(),
            format!("{}{}", self.kind.subject(), location),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code())?;
        match &self.kind {
            DiagnosticKind::CoverageGap { member } => write!(
                f,
                "member `{}` of `{}` has no binding and no matching member in `{}`",
                member, self.destination, self.source
            )?,
            DiagnosticKind::UnknownSourceMember { member, source_member } => write!(
                f,
                "member `{}` of `{}` is bound to `{}`, which `{}` does not have",
                member, self.destination, source_member, self.source
            )?,
            DiagnosticKind::UnknownDestinationMember { member } => write!(
                f,
                "`{}` has no member `{}` (mapping from `{}`)",
                self.destination, member, self.source
            )?,
            DiagnosticKind::Unconvertible { member, source_type, destination_type } => write!(
                f,
                "member `{}` cannot be converted from `{}` to `{}` ({} -> {})",
                member, source_type, destination_type, self.source, self.destination
            )?,
            DiagnosticKind::UnparsedDeclaration { message } => {
                write!(f, "mapping declaration not fully read: {}", message)?
            }
            DiagnosticKind::UnresolvedType { type_name } => {
                write!(f, "type `{}` was not found in the scanned sources", type_name)?
            }
        }
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}

/// Check finalized mappings and extraction issues, deduplicated, in a stable order.
pub fn check(mappings: &[FinalizedMapping], issues: &[ExtractionIssue]) -> Vec<Diagnostic> {
    let mut found: Vec<Diagnostic> = Vec::new();

    check_issues(issues, &mut found);
    for mapping in mappings {
        check_types(mapping, &mut found);
        check_members(mapping, &mut found);
    }

    let mut seen = HashSet::new();
    found.retain(|d| seen.insert(d.dedup_key()));
    found
}

fn check_issues(issues: &[ExtractionIssue], found: &mut Vec<Diagnostic>) {
    for issue in issues {
        found.push(Diagnostic {
            kind: DiagnosticKind::UnparsedDeclaration { message: issue.message.clone() },
            source: String::new(),
            destination: String::new(),
            location: Some(issue.location.clone()),
            severity: Severity::Warning,
        });
    }
}

fn check_types(mapping: &FinalizedMapping, found: &mut Vec<Diagnostic>) {
    for shape in [&mapping.source, &mapping.destination] {
        if !shape.resolved {
            found.push(Diagnostic {
                kind: DiagnosticKind::UnresolvedType { type_name: shape.name.clone() },
                source: String::new(),
                destination: String::new(),
                location: mapping.location.clone(),
                severity: Severity::Warning,
            });
        }
    }
}

fn check_members(mapping: &FinalizedMapping, found: &mut Vec<Diagnostic>) {
    let mk = |kind: DiagnosticKind| Diagnostic {
        kind,
        source: mapping.key.source.clone(),
        destination: mapping.key.destination.clone(),
        location: mapping.location.clone(),
        severity: Severity::Warning,
    };

    //an unknown destination already has its own diagnostic
    if mapping.destination.resolved {
        for member in &mapping.unknown_destinations {
            found.push(mk(DiagnosticKind::UnknownDestinationMember { member: member.clone() }));
        }
    }

    for plan in &mapping.members {
        let PlanValue::Missing(reason) = &plan.value else {
            continue;
        };
        let member = plan.destination.name.clone();
        match reason {
            MissingReason::NoSource if !mapping.ignore_non_existing && mapping.source.resolved => {
                found.push(mk(DiagnosticKind::CoverageGap { member }));
            }
            MissingReason::UnknownSource(source_member)
                if !mapping.ignore_non_existing && mapping.source.resolved =>
            {
                found.push(mk(DiagnosticKind::UnknownSourceMember {
                    member,
                    source_member: source_member.clone(),
                }));
            }
            MissingReason::Unconvertible { source } => {
                found.push(mk(DiagnosticKind::Unconvertible {
                    member,
                    source_type: source.to_string(),
                    destination_type: plan.destination.ty.to_string(),
                }));
            }
            _ => {}
        }
    }
}
