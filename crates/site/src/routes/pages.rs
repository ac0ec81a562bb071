//! Page route handlers.
//!
//! Marketing landing page, onboarding form, legal notice and the
//! post-checkout thank-you page.

use aichatflows_core::{DeliveryPickup, Plan, StoredSubmission, SubmissionMethod};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::filters;
use crate::state::AppState;

/// Landing page with the chat widget.
#[derive(Template, WebTemplate)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub llm_enabled: bool,
}

/// Onboarding form.
#[derive(Template, WebTemplate)]
#[template(path = "pages/start.html")]
pub struct StartTemplate {
    /// Wire value of the preselected plan, or empty.
    pub selected_plan: &'static str,
    pub plans: &'static [Plan],
    pub methods: &'static [SubmissionMethod],
    pub delivery_options: &'static [DeliveryPickup],
}

/// Legal notice.
#[derive(Template, WebTemplate)]
#[template(path = "pages/legal.html")]
pub struct LegalTemplate {
    pub support_email: Option<String>,
}

/// Post-checkout confirmation.
#[derive(Template, WebTemplate)]
#[template(path = "pages/thank_you.html")]
pub struct ThankYouTemplate {
    pub business_name: Option<String>,
    pub plan: Option<&'static str>,
    pub support_email: Option<String>,
}

/// `/start` query string.
#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub plan: Option<String>,
}

/// `/thank-you` query string.
#[derive(Debug, Deserialize)]
pub struct ThankYouQuery {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// Display the landing page.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    IndexTemplate {
        llm_enabled: state.chat().is_some(),
    }
}

/// Display the onboarding form, optionally with a plan preselected.
#[instrument]
pub async fn start(Query(query): Query<StartQuery>) -> impl IntoResponse {
    let selected_plan = query
        .plan
        .as_deref()
        .and_then(|p| p.parse::<Plan>().ok())
        .map_or("", |p| p.as_str());

    StartTemplate {
        selected_plan,
        plans: Plan::ALL,
        methods: SubmissionMethod::ALL,
        delivery_options: DeliveryPickup::ALL,
    }
}

/// Display the legal notice.
#[instrument(skip(state))]
pub async fn legal(State(state): State<AppState>) -> impl IntoResponse {
    LegalTemplate {
        support_email: support_email(&state),
    }
}

/// Display the thank-you page and send payment confirmations.
///
/// Checkout redirects here with `?ref=<request id>`; without a usable
/// reference the most recent submission is confirmed instead.
#[instrument(skip(state))]
pub async fn thank_you(
    State(state): State<AppState>,
    Query(query): Query<ThankYouQuery>,
) -> impl IntoResponse {
    let record = lookup_submission(&state, query.reference.as_deref()).await;

    if let Some(record) = record.as_ref() {
        let report = state.notifications().payment_confirmed(record).await;
        tracing::info!(
            request_id = %record.request_id,
            sent = report.sent,
            failed = report.failed,
            "Payment confirmation processed"
        );
    } else {
        tracing::warn!("Thank-you page visited with no stored submission to confirm");
    }

    ThankYouTemplate {
        business_name: record.as_ref().map(|r| r.details.business_name.clone()),
        plan: record.as_ref().map(|r| r.details.plan.as_str()),
        support_email: support_email(&state),
    }
}

async fn lookup_submission(state: &AppState, reference: Option<&str>) -> Option<StoredSubmission> {
    let store = state.submissions();
    let result = match reference.and_then(|r| Uuid::parse_str(r.trim()).ok()) {
        Some(id) => store.find(id).await,
        None => store.latest().await,
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read stored submission");
        None
    })
}

fn support_email(state: &AppState) -> Option<String> {
    state
        .config()
        .email
        .support_address
        .as_ref()
        .map(ToString::to_string)
}

/// Create the pages routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/start", get(start))
        .route("/legal", get(legal))
        .route("/thank-you", get(thank_you))
}
