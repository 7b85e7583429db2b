// crates/contract-probe-core/src/catalog/access.rs
// ============================================================================
// Module: Access Matrix Scenario
// Description: Wraps the role matrix runner as a catalog scenario.
// Purpose: Report one step per role x operation cell.
// Dependencies: async-trait
// ============================================================================

use async_trait::async_trait;

use crate::core::error::ProbeError;
use crate::runtime::scenario::Authentication;
use crate::runtime::scenario::Scenario;
use crate::runtime::scenario::ScenarioContext;

/// Every declared role, plus anonymous, against every protected operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessMatrixScenario;

#[async_trait]
impl Scenario for AccessMatrixScenario {
    fn name(&self) -> &str {
        "access-matrix"
    }

    fn description(&self) -> &str {
        "each role is allowed exactly the operations granted to it"
    }

    fn authentication(&self) -> Authentication {
        Authentication::Anonymous
    }

    async fn act(&self, ctx: &mut ScenarioContext) -> Result<(), ProbeError> {
        ctx.run_matrix().await;
        Ok(())
    }
}
