//! Transaction form model.
//!
//! [`TransactionForm`] owns the two inputs of the send form, the recipient
//! and the amount, and derives everything the submit button needs:
//!
//! ```text
//! set_to(text) ──► Debounced ──settled──► AddressResolver ──► resolved_address ─┐
//!                                                                                 ├─► TransactionRequest ─► submit()
//! set_amount(text) ─► Debounced ──settled──► parse_units ─────► base_amount ─────┘
//! ```
//!
//! Derived values are recomputed from scratch whenever an input settles and
//! are cleared the moment an input is edited, so a request never outlives
//! the text it was derived from. Every edit bumps its field's generation
//! counter while holding the state lock; a settled value is only derived
//! when it still matches the raw input, and its result is only applied
//! while the generation read alongside that check is still current. ENS
//! lookups race freely with further edits and at most one per form is
//! left running.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::address::{AddressResolver, ChecksumPolicy, DEFAULT_ENS_SUFFIX};
use crate::debounce::{DEFAULT_DEBOUNCE, Debounced, FieldPhase};
use crate::error::FormError;
use crate::provider::{TransactionRequest, TxHash, WalletProvider};
use crate::units::{ETHER_DECIMALS, parse_units};

/// Settings for a [`TransactionForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// Quiet period before an input is considered settled.
    pub debounce: Duration,
    /// Decimal exponent of the chain's native token.
    pub decimals: u8,
    /// Suffix that marks input as an ENS name.
    pub ens_suffix: String,
    /// Checksum policy for hex recipients.
    pub checksum: ChecksumPolicy,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            decimals: ETHER_DECIMALS,
            ens_suffix: DEFAULT_ENS_SUFFIX.to_string(),
            checksum: ChecksumPolicy::default(),
        }
    }
}

impl FormConfig {
    /// Set the debounce quiet period.
    #[must_use]
    pub const fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the native token decimals.
    #[must_use]
    pub const fn decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    fn resolver(&self) -> AddressResolver {
        AddressResolver::new(self.ens_suffix.clone(), self.checksum)
    }
}

/// Outcome of the most recent submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A submission is in flight.
    Pending,
    /// The wallet accepted the transaction.
    Sent(TxHash),
    /// The wallet reported an error; the message is shown verbatim.
    Failed(String),
}

impl SubmissionStatus {
    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Values derived from the settled inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    /// Recipient resolved from the settled `to` input.
    pub resolved_address: Option<Address>,
    /// Amount parsed from the settled `amount` input, in base units.
    pub base_amount: Option<U256>,
    /// The recipient was edited and has not been resolved yet.
    pub to_pending: bool,
    /// The amount was edited and has not been parsed yet.
    pub amount_pending: bool,
    /// Status of the last submission.
    pub submission: SubmissionStatus,
}

impl FormState {
    /// The transfer described by the current state, if it is complete.
    #[must_use]
    pub fn transaction_request(&self) -> Option<TransactionRequest> {
        let to = self.resolved_address?;
        let value = self.base_amount.filter(|v| !v.is_zero())?;
        Some(TransactionRequest { to, value })
    }

    /// Whether derived values reflect the latest input.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !self.to_pending && !self.amount_pending
    }
}

/// Everything a view needs to render the send form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    /// Raw recipient text.
    pub to_input: String,
    /// Raw amount text.
    pub amount_input: String,
    /// Recipient field phase.
    pub to_phase: FieldPhase,
    /// Amount field phase.
    pub amount_phase: FieldPhase,
    /// Derived state.
    pub state: FormState,
    /// The ready-to-submit request, if any.
    pub request: Option<TransactionRequest>,
    /// Whether the submit action is enabled.
    pub can_submit: bool,
}

/// The send-transaction form.
///
/// Must be created inside a Tokio runtime. Background tasks stop when the
/// form is dropped.
pub struct TransactionForm {
    wallet: Arc<dyn WalletProvider>,
    to: Debounced<String>,
    amount: Debounced<String>,
    state: Arc<watch::Sender<FormState>>,
    to_generation: Arc<AtomicU64>,
    amount_generation: Arc<AtomicU64>,
    decimals: Arc<AtomicU8>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for TransactionForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionForm")
            .field("to", &self.to.raw())
            .field("amount", &self.amount.raw())
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl TransactionForm {
    /// Create an empty form bound to `wallet`.
    #[must_use]
    pub fn new(wallet: Arc<dyn WalletProvider>, config: &FormConfig) -> Self {
        let to = Debounced::new(String::new(), config.debounce);
        let amount = Debounced::new(String::new(), config.debounce);
        let state = Arc::new(watch::Sender::new(FormState::default()));
        let to_generation = Arc::new(AtomicU64::new(0));
        let amount_generation = Arc::new(AtomicU64::new(0));
        let decimals = Arc::new(AtomicU8::new(config.decimals));

        let to_task = tokio::spawn(Self::resolve_recipients(
            Arc::clone(&wallet),
            config.resolver(),
            Field {
                settled: to.subscribe_settled(),
                raw: to.subscribe_raw(),
                generation: Arc::clone(&to_generation),
            },
            Arc::clone(&state),
        ));
        let amount_task = tokio::spawn(Self::parse_amounts(
            Arc::clone(&decimals),
            Field {
                settled: amount.subscribe_settled(),
                raw: amount.subscribe_raw(),
                generation: Arc::clone(&amount_generation),
            },
            Arc::clone(&state),
        ));

        Self {
            wallet,
            to,
            amount,
            state,
            to_generation,
            amount_generation,
            decimals,
            tasks: vec![to_task, amount_task],
        }
    }

    /// Edit the recipient input.
    pub fn set_to(&self, input: impl Into<String>) {
        let input = input.into();
        self.state.send_modify(|s| {
            s.resolved_address = None;
            s.to_pending = true;
            self.to.set(input);
            self.to_generation.fetch_add(1, Ordering::SeqCst);
        });
    }

    /// Edit the amount input.
    pub fn set_amount(&self, input: impl Into<String>) {
        let input = input.into();
        self.state.send_modify(|s| {
            s.base_amount = None;
            s.amount_pending = true;
            self.amount.set(input);
            self.amount_generation.fetch_add(1, Ordering::SeqCst);
        });
    }

    /// Change the native token decimals, e.g. after a network switch.
    ///
    /// Both inputs are kept; the amount is parsed again with the new
    /// exponent once it settles.
    pub fn set_decimals(&self, decimals: u8) {
        if self.decimals.swap(decimals, Ordering::SeqCst) != decimals {
            self.set_amount(self.amount.raw());
        }
    }

    /// Decimal exponent amounts are parsed with.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.decimals.load(Ordering::SeqCst)
    }

    /// Current derived state.
    #[must_use]
    pub fn state(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Watch derived state. A new value is published on every
    /// recomputation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    /// The ready-to-submit request, if both inputs are valid.
    #[must_use]
    pub fn transaction_request(&self) -> Option<TransactionRequest> {
        self.state.borrow().transaction_request()
    }

    /// Whether the submit action is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        let state = self.state.borrow();
        Self::submittable(&state, self.wallet.sender().is_some())
    }

    /// Full view of the form.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        let connected = self.wallet.sender().is_some();
        let state = self.state();
        FormSnapshot {
            to_input: self.to.raw(),
            amount_input: self.amount.raw(),
            to_phase: self.to.phase(),
            amount_phase: self.amount.phase(),
            request: state.transaction_request(),
            can_submit: Self::submittable(&state, connected),
            state,
        }
    }

    /// Wait until both inputs have settled and their derived values are
    /// computed.
    pub async fn settled(&self) -> FormState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(FormState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Submit the current request through the wallet.
    ///
    /// Returns [`FormError::NotReady`] without contacting the wallet when
    /// the submit action is disabled. Wallet failures are recorded in
    /// [`SubmissionStatus::Failed`] and returned; the inputs stay as they
    /// are so the user can edit or retry.
    pub async fn submit(&self) -> Result<TxHash, FormError> {
        let connected = self.wallet.sender().is_some();
        let mut request = None;
        self.state.send_if_modified(|s| {
            if !Self::submittable(s, connected) {
                return false;
            }
            request = s.transaction_request();
            s.submission = SubmissionStatus::Pending;
            true
        });
        let Some(request) = request else {
            debug!("submit ignored: form not ready");
            return Err(FormError::NotReady);
        };

        let guard = PendingGuard {
            state: &self.state,
            armed: true,
        };
        info!(to = %request.to, value = %request.value, "submitting transaction");
        let result = self.wallet.send_transaction(request).await;
        guard.disarm();

        match result {
            Ok(hash) => {
                info!(tx_hash = %hash, "transaction submitted");
                self.state
                    .send_modify(|s| s.submission = SubmissionStatus::Sent(hash));
                Ok(hash)
            }
            Err(e) => {
                warn!(error = %e, "transaction submission failed");
                let message = e.to_string();
                self.state
                    .send_modify(|s| s.submission = SubmissionStatus::Failed(message));
                Err(FormError::Submission(e))
            }
        }
    }

    fn submittable(state: &FormState, connected: bool) -> bool {
        connected
            && state.is_settled()
            && !state.submission.is_pending()
            && state.transaction_request().is_some()
    }

    async fn resolve_recipients(
        wallet: Arc<dyn WalletProvider>,
        resolver: AddressResolver,
        mut field: Field,
        state: Arc<watch::Sender<FormState>>,
    ) {
        // Dropping the set with this task aborts an in-flight lookup.
        let mut lookups = JoinSet::new();

        while let Some((input, current)) = field.next_settled(&state).await {
            // A newer settled value supersedes the previous lookup.
            lookups.abort_all();
            while lookups.try_join_next().is_some() {}

            let wallet = Arc::clone(&wallet);
            let resolver = resolver.clone();
            let state = Arc::clone(&state);
            let generation = Arc::clone(&field.generation);

            lookups.spawn(async move {
                let resolved = resolver.resolve(&input, wallet.as_ref()).await;
                state.send_if_modified(|s| {
                    if generation.load(Ordering::SeqCst) != current {
                        debug!(input = %input, "discarding stale recipient resolution");
                        return false;
                    }
                    debug!(input = %input, resolved = ?resolved, "recipient resolved");
                    s.resolved_address = resolved;
                    s.to_pending = false;
                    true
                });
            });
        }
    }

    async fn parse_amounts(
        decimals: Arc<AtomicU8>,
        mut field: Field,
        state: Arc<watch::Sender<FormState>>,
    ) {
        while let Some((input, current)) = field.next_settled(&state).await {
            let amount = parse_units(&input, decimals.load(Ordering::SeqCst));
            state.send_if_modified(|s| {
                if field.generation.load(Ordering::SeqCst) != current {
                    debug!(input = %input, "discarding stale amount");
                    return false;
                }
                debug!(input = %input, amount = ?amount, "amount parsed");
                s.base_amount = amount;
                s.amount_pending = false;
                true
            });
        }
    }
}

/// Receivers and edit counter of one debounced input.
struct Field {
    settled: watch::Receiver<String>,
    raw: watch::Receiver<String>,
    generation: Arc<AtomicU64>,
}

impl Field {
    /// Wait for the next settled value that still matches the raw input,
    /// together with the generation of the edit that produced it.
    ///
    /// Raw input and generation are read under the state lock, which edits
    /// hold while changing both.
    async fn next_settled(&mut self, state: &watch::Sender<FormState>) -> Option<(String, u64)> {
        while self.settled.changed().await.is_ok() {
            let input = self.settled.borrow_and_update().clone();
            let _edits = state.borrow();
            if *self.raw.borrow() != input {
                // Edited again after settling; a newer value is on its way.
                continue;
            }
            return Some((input, self.generation.load(Ordering::SeqCst)));
        }
        None
    }
}

impl Drop for TransactionForm {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Resets a pending submission to idle if the submit future is dropped
/// before the wallet answers.
struct PendingGuard<'a> {
    state: &'a watch::Sender<FormState>,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .send_modify(|s| s.submission = SubmissionStatus::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::provider::testing::FakeWallet;

    const QUIET: Duration = Duration::from_millis(500);
    const SENDER: Address = address!("0x1111111111111111111111111111111111111111");
    const VITALIK: Address = address!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
    const OTHER: Address = address!("0x2222222222222222222222222222222222222222");

    async fn settle_tasks() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn elapse(duration: Duration) {
        settle_tasks().await;
        tokio::time::advance(duration).await;
        settle_tasks().await;
    }

    fn form_with(wallet: FakeWallet) -> (Arc<FakeWallet>, TransactionForm) {
        let wallet = Arc::new(wallet);
        let form = TransactionForm::new(
            Arc::clone(&wallet) as Arc<dyn WalletProvider>,
            &FormConfig::default().debounce(QUIET),
        );
        (wallet, form)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_form_cannot_submit() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        assert!(form.transaction_request().is_none());
        assert!(!form.can_submit());
        assert_eq!(form.submit().await, Err(FormError::NotReady));
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_inputs_produce_request() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("0.05");

        assert!(form.transaction_request().is_none());
        elapse(QUIET).await;

        let request = form.transaction_request().unwrap();
        assert_eq!(request.to, VITALIK);
        assert_eq!(request.value, U256::from(50_000_000_000_000_000_u64));
        assert!(form.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_requires_positive_amount() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("0");
        elapse(QUIET).await;

        let state = form.state();
        assert_eq!(state.resolved_address, Some(VITALIK));
        assert_eq!(state.base_amount, Some(U256::ZERO));
        assert!(form.transaction_request().is_none());
        assert!(!form.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_precise_amount_disables_submit() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("1.0000000000000000001");
        elapse(QUIET).await;

        assert_eq!(form.state().base_amount, None);
        assert!(!form.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_wallet_disables_submit() {
        let (_, form) = form_with(FakeWallet::default());
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("1");
        elapse(QUIET).await;

        assert!(form.transaction_request().is_some());
        assert!(!form.can_submit());
        assert_eq!(form.submit().await, Err(FormError::NotReady));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_clears_request_until_settled() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("1");
        elapse(QUIET).await;
        assert!(form.can_submit());

        form.set_amount("2");
        assert!(form.transaction_request().is_none());
        assert!(!form.can_submit());

        elapse(QUIET).await;
        assert_eq!(
            form.transaction_request().unwrap().value,
            U256::from(2 * 10_u64.pow(18))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_resolve_once() {
        let (wallet, form) =
            form_with(FakeWallet::connected(SENDER).with_name("vitalik.eth", VITALIK));

        for text in ["v", "vi", "vitalik", "vitalik.", "vitalik.e", "vitalik.eth"] {
            form.set_to(text);
            elapse(Duration::from_millis(50)).await;
        }
        assert_eq!(wallet.lookup_count(), 0);

        elapse(QUIET).await;
        assert_eq!(wallet.lookup_count(), 1);
        assert_eq!(form.state().resolved_address, Some(VITALIK));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_lookup_is_discarded() {
        let wallet = FakeWallet::connected(SENDER)
            .with_name("slow.eth", OTHER)
            .with_name("vitalik.eth", VITALIK)
            .with_delay("slow.eth", Duration::from_secs(5));
        let (wallet, form) = form_with(wallet);

        form.set_to("slow.eth");
        elapse(QUIET).await;
        assert_eq!(wallet.lookup_count(), 1);
        assert!(form.state().to_pending);

        form.set_to("vitalik.eth");
        elapse(QUIET).await;
        assert_eq!(form.state().resolved_address, Some(VITALIK));

        elapse(Duration::from_secs(10)).await;
        assert_eq!(form.state().resolved_address, Some(VITALIK));
        assert_eq!(wallet.lookup_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_superseded_by_pending_edit() {
        let wallet = FakeWallet::connected(SENDER)
            .with_name("slow.eth", OTHER)
            .with_delay("slow.eth", Duration::from_secs(1));
        let (_, form) = form_with(wallet);

        form.set_to("slow.eth");
        elapse(QUIET).await;
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa960");

        elapse(Duration::from_secs(2)).await;
        let state = form.state();
        assert_eq!(state.resolved_address, None);
        assert!(!state.to_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_success_keeps_inputs() {
        let (wallet, form) = form_with(FakeWallet::connected(SENDER));
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("0.5");
        elapse(QUIET).await;

        let hash = form.submit().await.unwrap();
        let snapshot = form.snapshot();
        assert_eq!(snapshot.state.submission, SubmissionStatus::Sent(hash));
        assert_eq!(snapshot.to_input, "0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        assert_eq!(snapshot.amount_input, "0.5");
        assert!(snapshot.can_submit);
        assert_eq!(wallet.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_is_reported_verbatim() {
        let mut wallet = FakeWallet::connected(SENDER);
        wallet.send_error = Some("insufficient funds for gas * price + value".into());
        let (_, form) = form_with(wallet);
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("100");
        elapse(QUIET).await;

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "insufficient funds for gas * price + value");
        assert_eq!(
            form.state().submission,
            SubmissionStatus::Failed("insufficient funds for gas * price + value".into())
        );
        assert!(form.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_disabled_while_in_flight() {
        let mut wallet = FakeWallet::connected(SENDER);
        wallet.send_delay = Duration::from_secs(3);
        let (_, form) = form_with(wallet);
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("1");
        elapse(QUIET).await;

        let form = Arc::new(form);
        let first = tokio::spawn({
            let form = Arc::clone(&form);
            async move { form.submit().await }
        });
        settle_tasks().await;

        assert!(form.state().submission.is_pending());
        assert!(!form.can_submit());
        assert_eq!(form.submit().await, Err(FormError::NotReady));

        elapse(Duration::from_secs(3)).await;
        tokio_test::assert_ok!(first.await.unwrap());
        assert!(form.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_sees_recomputation() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        let mut rx = form.subscribe();
        rx.borrow_and_update();

        form.set_amount("3");
        elapse(QUIET).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().base_amount,
            Some(U256::from(3 * 10_u64.pow(18)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_derivation() {
        let (_, form) = form_with(FakeWallet::connected(SENDER).with_name("vitalik.eth", VITALIK));
        form.set_to("vitalik.eth");
        form.set_amount("1");

        let state = form.settled().await;
        assert_eq!(state.resolved_address, Some(VITALIK));
        assert!(state.transaction_request().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_decimals_keeps_inputs() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("1.5");
        elapse(QUIET).await;
        assert_eq!(form.state().base_amount, Some(U256::from(15 * 10_u64.pow(17))));

        form.set_decimals(6);
        assert_eq!(form.decimals(), 6);
        assert!(form.state().amount_pending);
        assert!(!form.can_submit());

        elapse(QUIET).await;
        let snapshot = form.snapshot();
        assert_eq!(snapshot.to_input, "0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        assert_eq!(snapshot.amount_input, "1.5");
        assert_eq!(snapshot.state.resolved_address, Some(VITALIK));
        assert_eq!(snapshot.state.base_amount, Some(U256::from(1_500_000_u64)));
        assert!(snapshot.can_submit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_decimals_rejects_over_precise_amount() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_amount("0.1234567");
        elapse(QUIET).await;
        assert!(form.state().base_amount.is_some());

        form.set_decimals(6);
        elapse(QUIET).await;
        assert_eq!(form.state().base_amount, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_decimals_is_no_edit() {
        let (_, form) = form_with(FakeWallet::connected(SENDER));
        form.set_amount("1");
        elapse(QUIET).await;

        form.set_decimals(18);
        assert!(!form.state().amount_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_toggles_submit() {
        let mut wallet = FakeWallet::default();
        wallet.connect_as = Some(SENDER);
        let (wallet, form) = form_with(wallet);
        form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
        form.set_amount("1");
        elapse(QUIET).await;
        assert!(!form.can_submit());

        let credential = crate::provider::Credential::PrivateKey("0x01".into());
        tokio_test::assert_ok!(wallet.connect(credential).await);
        assert!(form.can_submit());
        assert!(form.snapshot().can_submit);

        tokio_test::assert_ok!(wallet.disconnect().await);
        assert!(!form.can_submit());
        assert_eq!(form.submit().await, Err(FormError::NotReady));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_form_aborts_lookup() {
        let wallet = FakeWallet::connected(SENDER)
            .with_name("slow.eth", OTHER)
            .with_delay("slow.eth", Duration::from_secs(5));
        let (wallet, form) = form_with(wallet);
        let rx = form.subscribe();

        form.set_to("slow.eth");
        elapse(QUIET).await;
        assert_eq!(wallet.lookup_count(), 1);

        drop(form);
        settle_tasks().await;
        // The lookup task held the last state sender clone.
        assert!(rx.has_changed().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_invalid_edit_never_keeps_previous_recipient() {
        let wallet = Arc::new(FakeWallet::connected(SENDER));
        let form = TransactionForm::new(
            wallet as Arc<dyn WalletProvider>,
            &FormConfig::default().debounce(Duration::ZERO),
        );

        for _ in 0..200 {
            form.set_to("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
            tokio::task::yield_now().await;
            form.set_to("not-an-address");

            let state = tokio::time::timeout(Duration::from_secs(5), form.settled())
                .await
                .unwrap();
            assert_eq!(state.resolved_address, None);
            assert!(form.transaction_request().is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_invalid_edit_never_keeps_previous_amount() {
        let wallet = Arc::new(FakeWallet::connected(SENDER));
        let form = TransactionForm::new(
            wallet as Arc<dyn WalletProvider>,
            &FormConfig::default().debounce(Duration::ZERO),
        );

        for _ in 0..200 {
            form.set_amount("1");
            tokio::task::yield_now().await;
            form.set_amount("abc");

            let state = tokio::time::timeout(Duration::from_secs(5), form.settled())
                .await
                .unwrap();
            assert_eq!(state.base_amount, None);
        }
    }
}
