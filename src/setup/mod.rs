//! Interactive setup of a node's configuration record.

mod flows;
mod plan;
mod prompt;
mod wizard;

pub use flows::{Answers, FlowKind, SetupFlows, confirm_or_decline, summarize};
pub use plan::{DeployPlan, SetupStep, plan_deploy};
pub use prompt::InquireWizard;
pub use wizard::{Choice, MessageKind, TextQuestion, TextValidator, Wizard};
