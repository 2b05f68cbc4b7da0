//! Override protocol between a base generator and its blueprints
//!
//! A delegate blueprint replaces the base: the base keeps only its identity
//! tasks. A side-by-side blueprint runs next to the base and its templates
//! shadow the base's file by file.

use crate::diagnostics::Diagnostic;
use crate::generator::GeneratorInstance;
use crate::phase::{Phase, PhaseRegistry};
use crate::templates::TemplateRoot;

/// Whether composing `blueprint` hands the base generator over to it
pub fn should_delegate(blueprint: &GeneratorInstance) -> bool {
    !blueprint.is_side_by_side()
}

/// Phases the base implements but the delegating blueprint does not
pub fn missing_phases(base: &GeneratorInstance, blueprint: &GeneratorInstance) -> Vec<Phase> {
    PhaseRegistry::global()
        .ordered()
        .iter()
        .map(|spec| spec.phase)
        .filter(|&phase| {
            base.tasks().implements_delegable(phase) && !blueprint.tasks().implements(phase)
        })
        .collect()
}

/// One diagnostic per phase the delegating blueprint leaves out
pub fn check_implements_expected_phases(
    base: &GeneratorInstance,
    blueprint: &GeneratorInstance,
) -> Vec<Diagnostic> {
    missing_phases(base, blueprint)
        .into_iter()
        .map(|phase| Diagnostic::MissingPhaseImplementation {
            blueprint: blueprint.namespace().clone(),
            phase,
        })
        .collect()
}

/// What composing a set of blueprints does to their base
#[derive(Debug, Default)]
pub struct Negotiation {
    /// At least one blueprint takes over; the base keeps its identity tasks only
    pub delegate: bool,
    /// Roots searched before the base's own, in composition order
    pub overlay_roots: Vec<TemplateRoot>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn negotiate(base: &GeneratorInstance, blueprints: &[GeneratorInstance]) -> Negotiation {
    let mut negotiation = Negotiation::default();
    for blueprint in blueprints {
        if should_delegate(blueprint) {
            negotiation.delegate = true;
            for diagnostic in check_implements_expected_phases(base, blueprint) {
                diagnostic.emit();
                negotiation.diagnostics.push(diagnostic);
            }
        } else {
            for root in blueprint.template_roots() {
                if !negotiation.overlay_roots.contains(root) {
                    negotiation.overlay_roots.push(root.clone());
                }
            }
        }
    }
    negotiation
}
