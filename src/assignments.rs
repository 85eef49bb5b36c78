//! Assignment manager contract client

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::chain::abi::ParamType as P;
use crate::chain::{Address, Contract, EthTransport, PendingTransaction, TxOptions};
use crate::error::{ClientError, Result};
use crate::models::{Assignment, NewAssignment};

pub mod signatures {
    pub const CREATE_ASSIGNMENT: &str = "createAssignment(string,string,string,string,string)";
    pub const UPDATE_ASSIGNMENT: &str =
        "updateAssignment(uint256,string,string,string,string,string)";
    pub const DEACTIVATE_ASSIGNMENT: &str = "deactivateAssignment(uint256)";
    pub const ASSIGNMENT_COUNTER: &str = "assignmentCounter()";
    pub const GET_ASSIGNMENT: &str = "getAssignment(uint256)";
    pub const GET_ASSIGNMENT_QUESTION: &str = "getAssignmentQuestion(uint256)";
    pub const GET_ASSIGNMENT_EVALUATION_CRITERIA: &str =
        "getAssignmentEvaluationCriteria(uint256)";
    pub const GET_ASSIGNMENT_META_PROMPT: &str = "getAssignmentMetaPrompt(uint256)";
}

use signatures as sig;

/// Client for the assignment manager contract. Assignment ids start at 0.
pub struct AssignmentManagerClient {
    contract: Contract,
}

impl AssignmentManagerClient {
    pub fn new(transport: Arc<dyn EthTransport>, address: Address) -> Self {
        Self::from_contract(Contract::new(transport, address))
    }

    pub fn from_contract(contract: Contract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn set_default_account(&self, account: Option<Address>) {
        self.contract.set_default_account(account);
    }

    pub fn default_account(&self) -> Option<Address> {
        self.contract.default_account()
    }

    pub async fn create_assignment(&self, assignment: &NewAssignment) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::CREATE_ASSIGNMENT,
                &[
                    assignment.title.as_str().into(),
                    assignment.description.as_str().into(),
                    assignment.question.as_str().into(),
                    assignment.evaluation_criteria.as_str().into(),
                    assignment.meta_prompt.as_str().into(),
                ],
                TxOptions::default(),
            )
            .await
    }

    pub async fn update_assignment(
        &self,
        assignment_id: u64,
        assignment: &NewAssignment,
    ) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::UPDATE_ASSIGNMENT,
                &[
                    assignment_id.into(),
                    assignment.title.as_str().into(),
                    assignment.description.as_str().into(),
                    assignment.question.as_str().into(),
                    assignment.evaluation_criteria.as_str().into(),
                    assignment.meta_prompt.as_str().into(),
                ],
                TxOptions::default(),
            )
            .await
    }

    pub async fn deactivate_assignment(&self, assignment_id: u64) -> Result<PendingTransaction> {
        self.contract
            .send(
                sig::DEACTIVATE_ASSIGNMENT,
                &[assignment_id.into()],
                TxOptions::default(),
            )
            .await
    }

    pub async fn assignment_count(&self) -> Result<u64> {
        self.contract
            .call(sig::ASSIGNMENT_COUNTER, &[], &[P::Uint])
            .await?
            .u64()
    }

    pub async fn get_assignment(&self, assignment_id: u64) -> Result<Assignment> {
        let mut out = self
            .contract
            .call(
                sig::GET_ASSIGNMENT,
                &[assignment_id.into()],
                &[
                    P::String,
                    P::String,
                    P::String,
                    P::String,
                    P::String,
                    P::Uint,
                    P::Address,
                    P::Bool,
                ],
            )
            .await
            .map_err(|e| e.revert_as_not_found(|| format!("assignment {assignment_id}")))?;

        let title = out.string()?;
        let description = out.string()?;
        let question = out.string()?;
        let evaluation_criteria = out.string()?;
        let meta_prompt = out.string()?;
        let created = out.u64()?;
        let created_at = i64::try_from(created)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| ClientError::Decode(format!("invalid createdAt timestamp {created}")))?;

        Ok(Assignment {
            id: assignment_id,
            title,
            description,
            question,
            evaluation_criteria,
            meta_prompt,
            created_at,
            creator: out.address()?,
            is_active: out.bool()?,
        })
    }

    /// Read every assignment in `0..assignment_count()`.
    ///
    /// Issues one `getAssignment` per index and stops at the first failure.
    pub async fn get_all_assignments(&self) -> Result<Vec<Assignment>> {
        let count = self.assignment_count().await?;
        debug!(count, "Loading all assignments");

        let mut assignments = Vec::new();
        for id in 0..count {
            assignments.push(self.get_assignment(id).await?);
        }
        Ok(assignments)
    }

    pub async fn get_assignment_question(&self, assignment_id: u64) -> Result<String> {
        self.read_text(sig::GET_ASSIGNMENT_QUESTION, assignment_id).await
    }

    pub async fn get_assignment_evaluation_criteria(&self, assignment_id: u64) -> Result<String> {
        self.read_text(sig::GET_ASSIGNMENT_EVALUATION_CRITERIA, assignment_id)
            .await
    }

    pub async fn get_assignment_meta_prompt(&self, assignment_id: u64) -> Result<String> {
        self.read_text(sig::GET_ASSIGNMENT_META_PROMPT, assignment_id)
            .await
    }

    async fn read_text(&self, signature: &str, assignment_id: u64) -> Result<String> {
        self.contract
            .call(signature, &[assignment_id.into()], &[P::String])
            .await
            .map_err(|e| e.revert_as_not_found(|| format!("assignment {assignment_id}")))?
            .string()
    }
}
