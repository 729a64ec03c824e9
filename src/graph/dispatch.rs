//! The dispatcher: runs one request from `router` to `terminal`.

use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};

use crate::classifier::{Classifier, DomainLabel};
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::state::{EdgeTable, NodeId, RequestState};
use crate::graph::transcript::Entry;
use crate::knowledge::KnowledgeBase;
use crate::llm::provider::LlmProvider;
use crate::lookup::{FoodLookup, LlmFoodLookup, LookupTrigger, QueryExtractor};
use crate::responders::{self, Specialists};
use crate::store::WellnessStore;

/// Reply plus the final state of the run that produced it.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub reply: String,
    pub state: RequestState,
}

/// Routes messages through the wellness nodes.
///
/// Holds only immutable configuration and shared collaborators, so one
/// instance serves any number of concurrent requests.
pub struct DispatchGraph {
    classifier: Classifier,
    specialists: Specialists,
    food_lookup: Arc<dyn FoodLookup>,
    extractor: QueryExtractor,
    trigger: LookupTrigger,
    edges: EdgeTable,
    max_steps: usize,
}

impl DispatchGraph {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        knowledge: Arc<dyn KnowledgeBase>,
        store: Arc<dyn WellnessStore>,
        config: GraphConfig,
    ) -> Self {
        Self {
            classifier: Classifier::new(llm.clone()),
            specialists: Specialists::new(llm.clone(), knowledge, store, config.retrieval_k),
            food_lookup: Arc::new(LlmFoodLookup::new(llm.clone())),
            extractor: QueryExtractor::new(llm),
            trigger: LookupTrigger::default_phrases(),
            edges: EdgeTable::wellness(),
            max_steps: config.max_steps,
        }
    }

    /// Use a different food lookup collaborator.
    pub fn with_food_lookup(mut self, food_lookup: Arc<dyn FoodLookup>) -> Self {
        self.food_lookup = food_lookup;
        self
    }

    /// Use a different edge table.
    pub fn with_edges(mut self, edges: EdgeTable) -> Self {
        self.edges = edges;
        self
    }

    /// Run a message and return the reply text.
    pub async fn run(&self, user_id: &str, message: &str) -> Result<String, GraphError> {
        self.execute(user_id, message).await.map(|outcome| outcome.reply)
    }

    /// Run a message and return the reply with the final request state.
    pub async fn execute(&self, user_id: &str, message: &str) -> Result<Outcome, GraphError> {
        let state = RequestState::new(user_id, message);
        let span = info_span!(
            "dispatch",
            request_id = %state.request_id,
            user_id = %state.user_id
        );
        self.drive(state).instrument(span).await
    }

    async fn drive(&self, mut state: RequestState) -> Result<Outcome, GraphError> {
        info!("Dispatch started");
        let mut node = NodeId::Router;
        let mut steps = 0usize;

        while node != NodeId::Terminal {
            if steps >= self.max_steps {
                warn!(limit = self.max_steps, "Step limit exceeded");
                return Err(GraphError::StepLimitExceeded {
                    limit: self.max_steps,
                });
            }
            steps += 1;

            state.next = None;
            state.visited.push(node);
            debug!(node = %node, step = steps, "Running node");
            self.run_node(node, &mut state).await;

            node = self.edges.next(node, state.next)?;
        }

        finish(state)
    }

    async fn run_node(&self, node: NodeId, state: &mut RequestState) {
        let message = state.transcript.user_message().to_string();
        let user_id = state.user_id.clone();

        match node {
            NodeId::Router => {
                let label = self.classifier.classify(&message).await;
                info!(label = %label, "Intent detected");
                state
                    .transcript
                    .append(Entry::System(format!("Intent detected: {label}")));
                route(state, NodeId::for_label(label));
            }
            NodeId::Fitness => {
                let reply = self.specialists.fitness(&user_id, &message).await;
                reply_as(state, DomainLabel::Fitness, reply);
            }
            NodeId::Nutrition => {
                if self.trigger.needs_lookup(&message) {
                    let query = self.extractor.extract_query(&message).await;
                    info!(query = %query, "Requesting food lookup");
                    state.transcript.append(Entry::LookupRequest(query));
                    route(state, NodeId::Lookup);
                } else {
                    let reply = self.specialists.nutrition(&user_id, &message).await;
                    reply_as(state, DomainLabel::Nutrition, reply);
                    route(state, NodeId::Terminal);
                }
            }
            NodeId::Lookup => {
                let query = state
                    .transcript
                    .pending_lookup_request()
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string);
                match query {
                    Some(query) => {
                        let facts = self.food_lookup.lookup(&query).await;
                        state.transcript.append(Entry::LookupResult(facts));
                    }
                    None => warn!("Lookup node ran without a pending query"),
                }
                route(state, NodeId::NutritionResume);
            }
            NodeId::NutritionResume => {
                let reply = match state.transcript.fresh_lookup_result().cloned() {
                    Some(facts) => {
                        self.specialists
                            .nutrition_with_data(&user_id, &message, &facts)
                            .await
                    }
                    None => self.specialists.nutrition(&user_id, &message).await,
                };
                reply_as(state, DomainLabel::Nutrition, reply);
            }
            NodeId::Health => {
                let reply = self.specialists.health(&user_id, &message).await;
                reply_as(state, DomainLabel::Health, reply);
            }
            NodeId::Tracking => {
                let reply = self.specialists.tracking(&user_id).await;
                reply_as(state, DomainLabel::Tracking, reply);
            }
            NodeId::Miscellaneous => match self.classifier.detect_specialist_domain(&message).await {
                Some(domain) => {
                    info!(domain = %domain, "Re-routing out of miscellaneous");
                    state.rerouted_from = Some(NodeId::Miscellaneous);
                    state
                        .transcript
                        .append(Entry::System(format!("Re-routed to {domain}")));
                    route(state, NodeId::for_label(domain));
                }
                None => {
                    state
                        .transcript
                        .append(Entry::Assistant(responders::out_of_domain(&message)));
                    route(state, NodeId::Terminal);
                }
            },
            NodeId::Terminal => {}
        }
    }
}

/// Record a routing decision on the state and in the audit trail.
fn route(state: &mut RequestState, to: NodeId) {
    state.next = Some(to);
    state.transcript.append(Entry::NextNode(to));
}

fn reply_as(state: &mut RequestState, domain: DomainLabel, reply: String) {
    let reply = match state.rerouted_from {
        Some(_) => format!("{}{reply}", responders::rerouted_tag(domain)),
        None => reply,
    };
    state.transcript.append(Entry::Assistant(reply));
}

fn finish(state: RequestState) -> Result<Outcome, GraphError> {
    let reply = state
        .transcript
        .last_assistant()
        .ok_or(GraphError::NoReply)?
        .to_string();
    info!(path = ?state.visited, "Dispatch complete");
    Ok(Outcome { reply, state })
}
