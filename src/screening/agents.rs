//! Agent descriptors and the process-wide registry
//!
//! The two agents are built once at startup and shared read-only across
//! requests through `Arc`.

use crate::screening::pipeline::Stage;
use serde::Serialize;
use std::sync::Arc;

/// Static persona configuration for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDescriptor {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub allow_delegation: bool,
    pub model: String,
}

impl AgentDescriptor {
    fn new(role: &str, goal: &str, backstory: &str, model: &str) -> Self {
        Self {
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
            allow_delegation: false,
            model: model.to_string(),
        }
    }

    /// The senior compliance analyst who screens orders
    pub fn compliance_analyst(model: &str) -> Self {
        Self::new(
            "Senior Compliance Analyst",
            "Identify legal and regulatory violations in real-time.",
            "Expert in international trade laws and sanction lists. You ensure 100% legal integrity.",
            model,
        )
    }

    /// The risk and ethics auditor who writes the final report
    pub fn ethics_auditor(model: &str) -> Self {
        Self::new(
            "Risk & Ethics Auditor",
            "Assess the ethical impact and generate audit-ready reports.",
            "You prioritize transparency and selfless business practices. You flag high-risk transactions.",
            model,
        )
    }

    /// System prompt establishing the persona
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if !self.allow_delegation {
            prompt.push_str("\nYou work alone and do not delegate any part of the task.");
        }
        prompt
    }
}

/// Both agents, constructed once per process
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    compliance_analyst: Arc<AgentDescriptor>,
    ethics_auditor: Arc<AgentDescriptor>,
}

impl AgentRegistry {
    pub fn new(model: &str) -> Self {
        Self {
            compliance_analyst: Arc::new(AgentDescriptor::compliance_analyst(model)),
            ethics_auditor: Arc::new(AgentDescriptor::ethics_auditor(model)),
        }
    }

    pub fn compliance_analyst(&self) -> &Arc<AgentDescriptor> {
        &self.compliance_analyst
    }

    pub fn ethics_auditor(&self) -> &Arc<AgentDescriptor> {
        &self.ethics_auditor
    }

    /// Agent responsible for the given stage
    pub fn for_stage(&self, stage: Stage) -> &Arc<AgentDescriptor> {
        match stage {
            Stage::ComplianceScreening => &self.compliance_analyst,
            Stage::EthicsAudit => &self.ethics_auditor,
        }
    }

    /// Model identifier shared by both agents
    pub fn model(&self) -> &str {
        &self.compliance_analyst.model
    }
}
