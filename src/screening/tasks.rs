//! Per-request task descriptors

use crate::screening::agents::{AgentDescriptor, AgentRegistry};
use crate::screening::order::Order;
use crate::screening::pipeline::Stage;
use std::sync::Arc;

/// One unit of work bound to an agent
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub stage: Stage,
    pub description: String,
    pub expected_output: String,
    /// Structured order details handed to the agent alongside the description
    pub order_context: String,
    pub agent: Arc<AgentDescriptor>,
}

impl TaskDescriptor {
    /// Legal screening task for the compliance analyst
    pub fn compliance_screening(order: &Order, registry: &AgentRegistry) -> Self {
        Self {
            stage: Stage::ComplianceScreening,
            description: format!(
                "Analyze order {} for {} from {}. Verify against compliance rules.",
                order.order_id, order.customer_name, order.country
            ),
            expected_output: "Detailed compliance status (CLEARED/FLAGGED) with reasons."
                .to_string(),
            order_context: order_context(order),
            agent: Arc::clone(registry.compliance_analyst()),
        }
    }

    /// Final audit report task for the ethics auditor
    pub fn ethics_audit(order: &Order, registry: &AgentRegistry) -> Self {
        Self {
            stage: Stage::EthicsAudit,
            description: format!(
                "Create a final audit report for order {}. Evaluate the 'Sattvic' business integrity and risk level.",
                order.order_id
            ),
            expected_output: "A structured report ready for Wipro internal review.".to_string(),
            order_context: order_context(order),
            agent: Arc::clone(registry.ethics_auditor()),
        }
    }
}

fn order_context(order: &Order) -> String {
    format!(
        "order_id: {}\ncustomer_name: {}\ncountry: {}\namount: {}\nproduct_type: {}",
        order.order_id, order.customer_name, order.country, order.amount, order.product_type
    )
}

/// Both tasks for an order, in pipeline order
pub fn build_screening_tasks(order: &Order, registry: &AgentRegistry) -> Vec<TaskDescriptor> {
    vec![
        TaskDescriptor::compliance_screening(order, registry),
        TaskDescriptor::ethics_audit(order, registry),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            order_id: "ORD-7".to_string(),
            customer_name: "Globex".to_string(),
            country: "DE".to_string(),
            amount: 250.5,
            product_type: "chemicals".to_string(),
        }
    }

    #[test]
    fn test_screening_description_interpolates_order() {
        let registry = AgentRegistry::new("m");
        let task = TaskDescriptor::compliance_screening(&order(), &registry);

        assert_eq!(task.stage, Stage::ComplianceScreening);
        assert_eq!(
            task.description,
            "Analyze order ORD-7 for Globex from DE. Verify against compliance rules."
        );
        assert!(task.expected_output.contains("CLEARED/FLAGGED"));
        assert!(Arc::ptr_eq(&task.agent, registry.compliance_analyst()));
    }

    #[test]
    fn test_audit_description_interpolates_order() {
        let registry = AgentRegistry::new("m");
        let task = TaskDescriptor::ethics_audit(&order(), &registry);

        assert_eq!(task.stage, Stage::EthicsAudit);
        assert!(task.description.starts_with("Create a final audit report for order ORD-7."));
        assert!(task.description.contains("'Sattvic'"));
        assert_eq!(
            task.expected_output,
            "A structured report ready for Wipro internal review."
        );
        assert!(Arc::ptr_eq(&task.agent, registry.ethics_auditor()));
    }

    #[test]
    fn test_order_context_carries_amount_and_product() {
        let registry = AgentRegistry::new("m");
        let task = TaskDescriptor::ethics_audit(&order(), &registry);

        assert!(task.order_context.contains("amount: 250.5"));
        assert!(task.order_context.contains("product_type: chemicals"));
    }

    #[test]
    fn test_tasks_built_in_pipeline_order() {
        let registry = AgentRegistry::new("m");
        let stages: Vec<Stage> = build_screening_tasks(&order(), &registry)
            .iter()
            .map(|t| t.stage)
            .collect();

        assert_eq!(stages, vec![Stage::ComplianceScreening, Stage::EthicsAudit]);
    }
}
