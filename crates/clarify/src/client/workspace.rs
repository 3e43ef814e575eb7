use tracing::{info, warn};

use super::api::ApiClient;
use super::error::ClientError;
use crate::decisions::{
    AnalysisResult, AppliedSuggestion, Criterion, CriterionId, DecisionDetail, DecisionId,
    DecisionOption, Evaluation, OptionId, SuggestionRequest, SuggestionValidator,
};

/// Controller for one open decision.
///
/// Holds the last fetched detail and the last analysis. Any mutation drops the
/// analysis, since results are never cached past the data they were computed on.
pub struct DecisionWorkspace {
    api: ApiClient,
    detail: DecisionDetail,
    analysis: Option<AnalysisResult>,
}

impl DecisionWorkspace {
    pub async fn open(api: ApiClient, id: &DecisionId) -> Result<Self, ClientError> {
        let detail = api.get_decision(id).await?;
        Ok(Self {
            api,
            detail,
            analysis: None,
        })
    }

    pub fn detail(&self) -> &DecisionDetail {
        &self.detail
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn id(&self) -> &DecisionId {
        &self.detail.decision.id
    }

    pub async fn refresh(&mut self) -> Result<&DecisionDetail, ClientError> {
        self.detail = self.api.get_decision(&self.detail.decision.id).await?;
        Ok(&self.detail)
    }

    pub async fn add_option(
        &mut self,
        name: &str,
        summary: Option<&str>,
    ) -> Result<DecisionOption, ClientError> {
        let option = self.api.add_option(self.id(), name, summary).await?;
        self.analysis = None;
        self.detail.options.push(option.clone());
        self.resync().await;
        Ok(option)
    }

    pub async fn add_criterion(&mut self, name: &str, weight: i64) -> Result<Criterion, ClientError> {
        let criterion = self.api.add_criterion(self.id(), name, weight).await?;
        self.analysis = None;
        self.detail.criteria.push(criterion.clone());
        self.resync().await;
        Ok(criterion)
    }

    pub async fn record_evaluation(
        &mut self,
        option: &OptionId,
        criterion: &CriterionId,
        value: f64,
    ) -> Result<Evaluation, ClientError> {
        let evaluation = self
            .api
            .record_evaluation(self.id(), option, criterion, value)
            .await?;
        self.analysis = None;
        Ok(evaluation)
    }

    /// Runs the analysis. Refused locally while the decision has no options.
    pub async fn analyze(&mut self) -> Result<&AnalysisResult, ClientError> {
        self.require_options()?;
        let result = self.api.run_analysis(self.id()).await?;
        info!(
            decision_id = %self.detail.decision.id,
            recommended = %result.recommended.name,
            "analysis received"
        );
        Ok(self.analysis.insert(result))
    }

    /// Suggest, validate, apply, refresh, then analyze. Generated output that
    /// fails validation is never sent to the apply endpoint.
    pub async fn generate_with_ai(&mut self) -> Result<&AnalysisResult, ClientError> {
        self.require_options()?;

        let request = SuggestionRequest {
            decision_title: self.detail.decision.title.clone(),
            description: self.detail.decision.description.clone(),
            options: self
                .detail
                .options
                .iter()
                .map(|option| option.name.clone())
                .collect(),
        };
        let suggestion = self.api.suggest(&request).await?;

        SuggestionValidator::new(&self.detail.options, &self.detail.criteria)
            .validate(&suggestion)?;

        let applied: AppliedSuggestion = self
            .api
            .apply_ai_suggestion(self.id(), &suggestion)
            .await?;
        info!(
            decision_id = %self.detail.decision.id,
            criteria = applied.criteria.len(),
            evaluations = applied.evaluations.len(),
            "suggestion applied"
        );
        self.analysis = None;

        self.refresh().await?;
        self.analyze().await
    }

    /// Reload after a write the server already accepted. On failure the locally
    /// merged detail is kept so the caller never repeats the write.
    async fn resync(&mut self) {
        if let Err(err) = self.refresh().await {
            warn!(
                decision_id = %self.detail.decision.id,
                error = %err,
                "refresh after write failed; keeping local detail"
            );
        }
    }

    fn require_options(&self) -> Result<(), ClientError> {
        if self.detail.options.is_empty() {
            return Err(ClientError::Domain {
                code: "no_options".to_string(),
                message: "add at least one option first".to_string(),
            });
        }
        Ok(())
    }
}
