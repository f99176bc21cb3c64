//! Payment submission orchestrator.
//!
//! A [`Checkout`] owns one payment attempt from wallet selection to
//! confirmation. State lives behind a short-lived mutex that is never held
//! across an await, so every transition is atomic with respect to the other
//! futures polling the same checkout. Collaborator calls are the only
//! suspension points:
//!
//! 1. balance or route estimate
//! 2. signature and broadcast (or routing session)
//! 3. receipt
//! 4. backend updates

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use alloy_primitives::U256;
use payflow_common::address::Address;
use payflow_common::chain::Network;
use payflow_common::currency::PaymentCurrency;
use payflow_common::flow::{Flow, FlowWallet, Profile, Recipient};
use payflow_common::payment::{Payment, PaymentStatus, PaymentUpdate};
use payflow_common::resolver::{resolve, ResolveInput, Resolution};
use payflow_common::routing::{
    enabled_currencies, PaymentIntent, PaymentOption, RoutingSession, SessionOutcome,
};
use payflow_common::services::{
    FlowService, PaymentService, RoutingError, RoutingService, SmartAccountTransfer,
    TransactionSender, WalletClient, WalletError,
};
use payflow_common::token::{format_units, parse_units, StaticTokenRegistry, Token, TokenRegistry};
use payflow_common::transaction::{TransactionRequest, TxHash};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Failure};
use crate::notify::{NotificationId, Notifier, TransferSummary};
use crate::registry::{InFlightGuard, InFlightRegistry};
use crate::sender::FlowSender;
use crate::state::{CheckoutState, CheckoutView, Prompt, Quote, Selection, StateKind};

/// The destination call a routed payment pays for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedTarget {
    pub network: Network,
    pub call: TransactionRequest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutMode {
    /// Same-chain transfer from the selected wallet to the recipient.
    Direct,
    /// Cross-chain payment through the routing service.
    Routed { target: RoutedTarget },
}

impl CheckoutMode {
    pub fn is_routed(&self) -> bool {
        matches!(self, CheckoutMode::Routed { .. })
    }
}

/// Everything a checkout is opened with.
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    /// Sender profile; its identity may co-own smart accounts.
    pub profile: Profile,
    /// Flow paying the payment.
    pub flow: Flow,
    pub payment: Payment,
    pub recipient: Recipient,
    pub mode: CheckoutMode,
}

pub struct Collaborators<B, W, R, N> {
    pub backend: B,
    pub wallet: W,
    pub routing: R,
    pub notifier: N,
}

/// Routing collaborator for checkouts that never route.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRouting;

impl RoutingService for NoRouting {
    async fn list_payment_options(
        &self,
        _intent: &PaymentIntent,
    ) -> Result<Vec<PaymentOption>, RoutingError> {
        Err(RoutingError::Unavailable("routing not configured".into()))
    }

    async fn estimate_payment(
        &self,
        _intent: &PaymentIntent,
        _currency: &PaymentCurrency,
    ) -> Result<Option<PaymentOption>, RoutingError> {
        Err(RoutingError::Unavailable("routing not configured".into()))
    }

    async fn create_session(
        &self,
        _intent: &PaymentIntent,
        _currency: &PaymentCurrency,
        _current_network: Network,
    ) -> Result<RoutingSession, RoutingError> {
        Err(RoutingError::Unavailable("routing not configured".into()))
    }

    async fn execute_session<S: TransactionSender>(
        &self,
        _session: &RoutingSession,
        _sender: &S,
    ) -> Result<SessionOutcome, RoutingError> {
        Err(RoutingError::Unavailable("routing not configured".into()))
    }
}

enum Action {
    Direct(TransactionRequest),
    Routed {
        intent: PaymentIntent,
        currency: PaymentCurrency,
    },
}

/// Proof that `begin_submission` moved the checkout to `AwaitingSignature`.
/// Holds the in-flight claim until the submission settles.
pub struct SubmissionTicket {
    notification: NotificationId,
    _claim: Option<InFlightGuard>,
    flow: Flow,
    wallet: FlowWallet,
    summary: TransferSummary,
    action: Action,
}

impl SubmissionTicket {
    pub fn notification(&self) -> NotificationId {
        self.notification
    }

    pub fn network(&self) -> Network {
        self.wallet.network
    }
}

struct Inner {
    state: CheckoutState,
    prompt: Option<Prompt>,
    resolution: Resolution,
    selection: Selection,
    quote: Option<Quote>,
    allowed: Option<Vec<PaymentCurrency>>,
    flow: Flow,
    payment: Payment,
    /// Bumped on every selection change; stale estimates compare against it.
    epoch: u64,
}

impl Inner {
    fn transition(&mut self, next: CheckoutState) -> Result<(), CheckoutError> {
        let from = self.state.kind();
        let to = next.kind();
        if !from.can_transition_to(to) {
            return Err(CheckoutError::InvalidTransition { from, to });
        }
        tracing::debug!(?from, ?to, "checkout state");
        self.state = next;
        Ok(())
    }

    /// The selection changed: quotes are stale and the checkout needs a new
    /// estimate.
    fn selection_changed(&mut self) {
        self.epoch += 1;
        self.quote = None;
        if matches!(
            self.prompt,
            Some(Prompt::SwitchNetwork { .. } | Prompt::SwitchFailed { .. })
        ) {
            self.prompt = None;
        }
        if matches!(
            self.state.kind(),
            StateKind::Estimating | StateKind::Ready | StateKind::Failed
        ) {
            self.state = CheckoutState::Idle;
        }
    }

    fn ensure_idle_selection(&self) -> Result<(), CheckoutError> {
        if self.state.in_flight() {
            Err(CheckoutError::SubmissionInFlight)
        } else {
            Ok(())
        }
    }

    /// Amount to send in base units of `token`: the manual amount, else the
    /// payment's fixed token amount.
    fn amount_for(&self, token: &Token) -> Result<Option<U256>, CheckoutError> {
        if let Some(amount) = self.selection.amount {
            return Ok(Some(amount));
        }
        Ok(self.payment.token_amount_units(token.decimals).transpose()?)
    }

    fn mark_wallet_deployed(&mut self, network: Network) {
        if let Some(wallet) = self.flow.wallet_on_mut(network) {
            wallet.mark_deployed();
        }
        for entry in &mut self.resolution.compatible {
            if entry.wallet.network == network {
                entry.wallet.deployed = true;
            }
        }
        for wallet in [
            self.selection.wallet.as_mut(),
            self.resolution.default_wallet.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            if wallet.network == network {
                wallet.deployed = true;
            }
        }
    }
}

fn is_rejection(err: &CheckoutError) -> bool {
    matches!(
        err,
        CheckoutError::Wallet(WalletError::Rejected)
            | CheckoutError::Routing(RoutingError::Wallet(WalletError::Rejected))
    )
}

fn failure_of(err: &CheckoutError) -> Failure {
    match err {
        CheckoutError::Wallet(e) => Failure::from(e),
        CheckoutError::Routing(e) => Failure::from(e),
        CheckoutError::Failed(f) => f.clone(),
        CheckoutError::RouteUnavailable => Failure::NoRoute,
        other => Failure::Collaborator(other.to_string()),
    }
}

pub struct Checkout<B, W, R, N> {
    backend: B,
    wallet: W,
    routing: R,
    notifier: N,
    tokens: Box<dyn TokenRegistry + Send + Sync>,
    registry: InFlightRegistry,
    profile: Profile,
    recipient: Recipient,
    mode: CheckoutMode,
    inner: Mutex<Inner>,
    live: AtomicBool,
}

impl<B, W, R, N> Checkout<B, W, R, N>
where
    B: PaymentService + FlowService,
    W: WalletClient + SmartAccountTransfer,
    R: RoutingService,
    N: Notifier,
{
    pub fn new(request: CheckoutRequest, collaborators: Collaborators<B, W, R, N>) -> Self {
        let CheckoutRequest {
            profile,
            flow,
            payment,
            recipient,
            mode,
        } = request;
        Self {
            backend: collaborators.backend,
            wallet: collaborators.wallet,
            routing: collaborators.routing,
            notifier: collaborators.notifier,
            tokens: Box::new(StaticTokenRegistry),
            registry: InFlightRegistry::new(),
            profile,
            recipient,
            mode,
            inner: Mutex::new(Inner {
                state: CheckoutState::Idle,
                prompt: None,
                resolution: Resolution::default(),
                selection: Selection::default(),
                quote: None,
                allowed: None,
                flow,
                payment,
                epoch: 0,
            }),
            live: AtomicBool::new(true),
        }
    }

    /// Share in-flight claims with other checkouts of the same process.
    pub fn with_registry(mut self, registry: InFlightRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_tokens(mut self, tokens: impl TokenRegistry + Send + Sync + 'static) -> Self {
        self.tokens = Box::new(tokens);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_live(&self) -> Result<(), CheckoutError> {
        if self.live.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CheckoutError::Detached)
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn state(&self) -> CheckoutState {
        self.lock().state.clone()
    }

    pub fn payment(&self) -> Payment {
        self.lock().payment.clone()
    }

    pub fn flow(&self) -> Flow {
        self.lock().flow.clone()
    }

    pub fn mode(&self) -> &CheckoutMode {
        &self.mode
    }

    pub fn view(&self) -> CheckoutView {
        let inner = self.lock();
        CheckoutView {
            state: inner.state.clone(),
            loading: inner.state.is_loading(),
            prompt: inner.prompt.clone(),
            compatible: inner.resolution.compatible.clone(),
            selection: inner.selection.clone(),
            quote: inner.quote.clone(),
        }
    }

    /// The owner was torn down. Pending results are dropped from now on and
    /// no further backend calls are made.
    pub fn detach(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        !self.live.load(Ordering::Acquire)
    }

    // ─── Selection ───────────────────────────────────────────────────────────

    /// Re-run the resolver against the current inputs and adopt its defaults.
    pub fn refresh_selection(&self) -> Result<Resolution, CheckoutError> {
        let active = self.wallet.active_network();
        let recipient_networks = self.recipient.networks();

        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.ensure_idle_selection()?;

        let resolution = {
            let input = ResolveInput {
                flow: &inner.flow,
                payment: Some(&inner.payment),
                cross_chain: self.mode.is_routed(),
                allowed_currencies: inner.allowed.as_deref(),
                recipient_networks: recipient_networks.as_deref(),
                active_network: active,
                current_token: inner.selection.token.as_ref(),
            };
            resolve(&input, &*self.tokens)
        };

        let changed = inner.selection.wallet != resolution.default_wallet
            || inner.selection.token != resolution.default_token;
        if changed {
            tracing::debug!(
                wallet = ?resolution.default_wallet.as_ref().map(|w| w.network),
                token = ?resolution.default_token.as_ref().map(|t| t.id.as_str()),
                "selection changed"
            );
            if inner.selection.token != resolution.default_token {
                inner.selection.amount = None;
            }
            inner.selection.wallet = resolution.default_wallet.clone();
            inner.selection.token = resolution.default_token.clone();
            inner.selection_changed();
        }
        inner.resolution = resolution.clone();
        Ok(resolution)
    }

    pub fn select_wallet(&self, network: Network) -> Result<(), CheckoutError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.ensure_idle_selection()?;
        if !inner
            .resolution
            .select_wallet(network, inner.selection.token.as_ref())
        {
            return Err(CheckoutError::InputIncomplete("compatible wallet"));
        }
        if inner.selection.token != inner.resolution.default_token {
            inner.selection.amount = None;
        }
        inner.selection.wallet = inner.resolution.default_wallet.clone();
        inner.selection.token = inner.resolution.default_token.clone();
        inner.selection_changed();
        Ok(())
    }

    pub fn select_token(&self, token: &Token) -> Result<(), CheckoutError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.ensure_idle_selection()?;
        if !inner.resolution.select_token(token) {
            return Err(CheckoutError::InputIncomplete("compatible token"));
        }
        if inner.selection.token.as_ref() != Some(token) {
            inner.selection.amount = None;
            inner.selection.token = Some(token.clone());
            inner.selection_changed();
        }
        Ok(())
    }

    /// Set a decimal amount of the selected token.
    pub fn set_amount(&self, amount: &str) -> Result<U256, CheckoutError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.ensure_idle_selection()?;
        let token = inner
            .selection
            .token
            .as_ref()
            .ok_or(CheckoutError::InputIncomplete("token"))?;
        let units = parse_units(amount, token.decimals)?;
        if inner.selection.amount != Some(units) {
            inner.selection.amount = Some(units);
            inner.selection_changed();
        }
        Ok(units)
    }

    // ─── Estimation ──────────────────────────────────────────────────────────

    /// Query the routing service once for the currencies it can take, and
    /// narrow the compatible set to them.
    pub async fn load_payment_options(&self) -> Result<Vec<PaymentOption>, CheckoutError> {
        let CheckoutMode::Routed { target } = &self.mode else {
            return Err(CheckoutError::InputIncomplete("routed payment target"));
        };
        let account = self
            .lock()
            .flow
            .wallets
            .first()
            .map(|w| w.address)
            .ok_or(CheckoutError::InputIncomplete("wallet"))?;
        let intent = PaymentIntent {
            account,
            network: target.network,
            call: target.call.clone(),
        };

        let options = self.routing.list_payment_options(&intent).await?;
        self.ensure_live()?;
        tracing::info!(count = options.len(), "payment options loaded");

        self.lock().allowed = Some(enabled_currencies(&options));
        self.refresh_selection()?;
        Ok(options)
    }

    /// `Idle → Estimating → Ready`, or a terminal no-route failure.
    pub async fn estimate(&self) -> Result<Quote, CheckoutError> {
        let (epoch, wallet, token, amount) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            inner.ensure_idle_selection()?;
            let wallet = inner
                .selection
                .wallet
                .clone()
                .ok_or(CheckoutError::InputIncomplete("wallet"))?;
            let token = inner
                .selection
                .token
                .clone()
                .ok_or(CheckoutError::InputIncomplete("token"))?;
            let amount = inner.amount_for(&token)?;
            inner.transition(CheckoutState::Estimating)?;
            inner.quote = None;
            (inner.epoch, wallet, token, amount)
        };

        let result: Result<Option<Quote>, CheckoutError> = match &self.mode {
            CheckoutMode::Direct => self
                .wallet
                .balance(&wallet.address, wallet.network, &token)
                .await
                .map(|balance| {
                    let covers = !balance.is_zero() && amount.is_none_or(|a| balance >= a);
                    covers.then_some(Quote::Balance {
                        amount: balance,
                        decimals: token.decimals,
                    })
                })
                .map_err(CheckoutError::from),
            CheckoutMode::Routed { target } => {
                let intent = PaymentIntent {
                    account: wallet.address,
                    network: target.network,
                    call: target.call.clone(),
                };
                self.routing
                    .estimate_payment(&intent, &token.currency())
                    .await
                    .map(|option| option.map(Quote::Route))
                    .map_err(CheckoutError::from)
            }
        };
        self.ensure_live()?;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Err(CheckoutError::Superseded);
        }
        match result {
            Ok(Some(quote)) => {
                if let Quote::Balance { amount, decimals } = &quote {
                    tracing::debug!(
                        network = %wallet.network,
                        token = %token.id,
                        balance = %format_units(*amount, *decimals),
                        "balance covers payment"
                    );
                }
                inner.transition(CheckoutState::Ready)?;
                inner.quote = Some(quote.clone());
                Ok(quote)
            }
            Ok(None) => {
                tracing::info!(network = %wallet.network, token = %token.id, "no route");
                inner.transition(CheckoutState::Failed(Failure::NoRoute))?;
                Err(CheckoutError::RouteUnavailable)
            }
            Err(err) => {
                let failure = failure_of(&err);
                tracing::warn!(network = %wallet.network, "estimate failed: {err}");
                inner.transition(CheckoutState::Failed(failure.clone()))?;
                if failure == Failure::NoRoute {
                    Err(CheckoutError::RouteUnavailable)
                } else {
                    Err(err)
                }
            }
        }
    }

    // ─── Submission ──────────────────────────────────────────────────────────

    /// Ask the wallet to switch to the selected wallet's network. Failure is
    /// surfaced as a retryable prompt.
    pub async fn switch_network(&self) -> Result<(), CheckoutError> {
        let target = {
            let inner = self.lock();
            inner.ensure_idle_selection()?;
            inner
                .selection
                .wallet
                .as_ref()
                .map(|w| w.network)
                .ok_or(CheckoutError::InputIncomplete("wallet"))?
        };

        let result = self.wallet.switch_network(target).await;
        self.ensure_live()?;

        let mut inner = self.lock();
        match result {
            Ok(()) => {
                tracing::info!(network = %target, "network switched");
                inner.prompt = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(network = %target, "network switch failed: {err}");
                inner.prompt = Some(Prompt::SwitchFailed {
                    to: target,
                    reason: err.to_string(),
                });
                Err(CheckoutError::Wallet(err))
            }
        }
    }

    /// `Ready → AwaitingSignature`. Synchronous, so two submits racing on the
    /// same checkout cannot both get past this point.
    pub fn begin_submission(&self) -> Result<SubmissionTicket, CheckoutError> {
        let active = self.wallet.active_network();
        let connected = self.wallet.connected_address();

        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.state.in_flight() {
            return Err(CheckoutError::SubmissionInFlight);
        }
        if inner.state.kind() != StateKind::Ready {
            return Err(CheckoutError::InvalidTransition {
                from: inner.state.kind(),
                to: StateKind::AwaitingSignature,
            });
        }
        let wallet = inner
            .selection
            .wallet
            .clone()
            .ok_or(CheckoutError::InputIncomplete("wallet"))?;
        let token = inner
            .selection
            .token
            .clone()
            .ok_or(CheckoutError::InputIncomplete("token"))?;

        if active != Some(wallet.network) {
            inner.prompt = Some(Prompt::SwitchNetwork {
                from: active,
                to: wallet.network,
            });
            return Err(CheckoutError::NetworkSwitchRequired(wallet.network));
        }
        let expected = inner.flow.signer.address;
        if connected.as_ref() != Some(&expected) {
            inner.prompt = Some(Prompt::ReconnectSigner {
                expected,
                connected,
            });
            return Err(CheckoutError::SignerMismatch {
                expected: expected.to_string(),
                connected: connected.map(|a| a.to_string()),
            });
        }

        let (action, to) = match &self.mode {
            CheckoutMode::Direct => {
                let to = self
                    .recipient
                    .address_on(wallet.network)
                    .ok_or(CheckoutError::InputIncomplete("recipient address"))?;
                let amount = inner
                    .amount_for(&token)?
                    .ok_or(CheckoutError::InputIncomplete("amount"))?;
                let call = TransactionRequest::token_transfer(&token, to, amount);
                (Action::Direct(call), Some(to))
            }
            CheckoutMode::Routed { target } => {
                let currency = match &inner.quote {
                    Some(Quote::Route(option)) => option.payment_currency.clone(),
                    _ => token.currency(),
                };
                let intent = PaymentIntent {
                    account: wallet.address,
                    network: target.network,
                    call: target.call.clone(),
                };
                (
                    Action::Routed { intent, currency },
                    self.recipient.address_on(target.network),
                )
            }
        };

        let claim = match &inner.payment.reference_id {
            Some(id) => Some(
                self.registry
                    .claim(id)
                    .ok_or(CheckoutError::SubmissionInFlight)?,
            ),
            None => None,
        };

        inner.transition(CheckoutState::AwaitingSignature)?;
        inner.prompt = None;

        let summary = TransferSummary {
            from: wallet.address,
            to,
            network: wallet.network,
            token: token.id.clone(),
            usd_amount: inner.payment.usd_amount,
            hash: None,
        };
        let notification = self.notifier.loading(&summary);
        tracing::info!(
            reference_id = ?inner.payment.reference_id.as_ref().map(|r| r.to_string()),
            network = %wallet.network,
            token = %token.id,
            flow = inner.flow.kind.label(),
            "submission started"
        );

        Ok(SubmissionTicket {
            notification,
            _claim: claim,
            flow: inner.flow.clone(),
            wallet,
            summary,
            action,
        })
    }

    fn mark_broadcast(&self, hash: &TxHash) {
        let mut inner = self.lock();
        if let Err(err) = inner.transition(CheckoutState::Broadcasting { hash: hash.clone() }) {
            tracing::warn!(tx_hash = %hash, "ignoring broadcast: {err}");
        }
    }

    fn fail(
        &self,
        notification: NotificationId,
        summary: &TransferSummary,
        failure: Failure,
    ) -> CheckoutError {
        if let Err(err) = self
            .lock()
            .transition(CheckoutState::Failed(failure.clone()))
        {
            return err;
        }
        tracing::warn!(status = ?failure.status(), "payment failed: {failure}");
        self.notifier
            .error(notification, summary, &failure.user_message());
        CheckoutError::Failed(failure)
    }

    /// Drop a stale result: dismiss the toast and touch nothing else.
    fn abandon(&self, notification: NotificationId) -> CheckoutError {
        tracing::debug!("checkout detached, dropping result");
        self.notifier.dismiss(notification);
        CheckoutError::Detached
    }

    async fn run_session(
        &self,
        sender: &FlowSender<'_, W>,
        intent: &PaymentIntent,
        currency: &PaymentCurrency,
        current_network: Network,
    ) -> Result<(TxHash, PaymentUpdate), CheckoutError> {
        let session = self
            .routing
            .create_session(intent, currency, current_network)
            .await?;
        self.ensure_live()?;
        tracing::info!(session_id = %session.session_id, "routing session created");

        let outcome = self.routing.execute_session(&session, sender).await?;
        let source_hash = sender.last_hash().ok_or_else(|| {
            RoutingError::Session("session finished without a source transaction".into())
        })?;
        let fulfillment_hash = outcome
            .sponsored_transaction_hash
            .ok_or_else(|| RoutingError::Session("no fulfillment transaction".into()))?;

        let update = PaymentUpdate {
            hash: Some(source_hash.clone()),
            fulfillment_id: Some(session.session_id),
            fulfillment_chain_id: Some(intent.network),
            fulfillment_hash: Some(fulfillment_hash),
            ..Default::default()
        };
        Ok((source_hash, update))
    }

    /// Sign, broadcast and confirm the transaction of `ticket`.
    pub async fn complete_submission(
        &self,
        ticket: SubmissionTicket,
    ) -> Result<TxHash, CheckoutError> {
        let SubmissionTicket {
            notification,
            _claim,
            flow,
            wallet,
            mut summary,
            action,
        } = ticket;

        // The signer may have gone away since `begin_submission`.
        let connected = self.wallet.connected_address();
        if connected.as_ref() != Some(&flow.signer.address) {
            {
                let mut inner = self.lock();
                inner.transition(CheckoutState::Ready)?;
                inner.prompt = Some(Prompt::ReconnectSigner {
                    expected: flow.signer.address,
                    connected,
                });
            }
            self.notifier.dismiss(notification);
            tracing::warn!("signer disconnected before signing");
            return Err(CheckoutError::SignerMismatch {
                expected: flow.signer.address.to_string(),
                connected: connected.map(|a| a.to_string()),
            });
        }

        let on_hash = |hash: &TxHash| self.mark_broadcast(hash);
        let sender = FlowSender::new(
            &self.wallet,
            &flow,
            &self.profile.identity,
            &wallet,
            &on_hash,
        );
        let sent = match &action {
            Action::Direct(call) => sender
                .send_call(wallet.network, call)
                .await
                .map(|hash| {
                    let update = PaymentUpdate::with_hash(hash.clone());
                    (hash, update)
                })
                .map_err(CheckoutError::from),
            Action::Routed { intent, currency } => {
                self.run_session(&sender, intent, currency, wallet.network)
                    .await
            }
        };
        if self.is_detached() {
            return Err(self.abandon(notification));
        }

        let (hash, update) = match sent {
            Ok(sent) => sent,
            Err(err) if is_rejection(&err) => {
                self.lock().transition(CheckoutState::Ready)?;
                self.notifier.dismiss(notification);
                tracing::info!("signature rejected");
                return Err(CheckoutError::SignatureRejected);
            }
            Err(err) => return Err(self.fail(notification, &summary, failure_of(&err))),
        };

        self.lock()
            .transition(CheckoutState::Confirming { hash: hash.clone() })?;
        let receipt = self.wallet.wait_for_receipt(wallet.network, &hash).await;
        if self.is_detached() {
            return Err(self.abandon(notification));
        }

        let receipt = match receipt {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.fail(notification, &summary, Failure::from(&err))),
        };
        if !receipt.success {
            let failure = Failure::from_revert(receipt.revert_reason.as_deref());
            return Err(self.fail(notification, &summary, failure));
        }

        let reference_id = {
            let mut inner = self.lock();
            inner.transition(CheckoutState::Confirmed { hash: hash.clone() })?;
            inner.payment.apply(&update);
            if inner.payment.status.can_transition_to(&PaymentStatus::Completed) {
                inner.payment.status = PaymentStatus::Completed;
            }
            if flow.kind.is_smart_account() && !wallet.deployed {
                inner.mark_wallet_deployed(wallet.network);
            }
            inner.payment.reference_id.clone()
        };
        summary.hash = Some(hash.clone());
        self.notifier.success(notification, &summary);
        tracing::info!(tx_hash = %hash, network = %wallet.network, "payment confirmed");

        // Backend bookkeeping. On-chain state is authoritative, so failures
        // are logged and left for reconciliation.
        if let Some(reference_id) = &reference_id {
            if let Err(err) = self.backend.update_payment(reference_id, &update).await {
                tracing::error!(
                    reference_id = %reference_id,
                    tx_hash = %hash,
                    "failed to record payment: {err}"
                );
            }
        }
        if flow.kind.is_smart_account() && !wallet.deployed {
            let mut deployed = wallet.clone();
            deployed.mark_deployed();
            if let Err(err) = self.backend.update_wallet(&flow.uuid, &deployed).await {
                tracing::error!(
                    flow = %flow.uuid,
                    network = %wallet.network,
                    "failed to mark wallet deployed: {err}"
                );
            }
        }

        Ok(hash)
    }

    /// `begin_submission` followed by `complete_submission`.
    pub async fn submit(&self) -> Result<TxHash, CheckoutError> {
        let ticket = self.begin_submission()?;
        self.complete_submission(ticket).await
    }

    /// Back to `Idle` from `Ready`, `Confirmed` or `Failed`.
    pub fn reset(&self) -> Result<(), CheckoutError> {
        let mut inner = self.lock();
        if inner.state.in_flight() {
            return Err(CheckoutError::SubmissionInFlight);
        }
        if inner.state.kind() == StateKind::Idle {
            return Ok(());
        }
        if inner.state.kind() == StateKind::Estimating {
            return Err(CheckoutError::InvalidTransition {
                from: StateKind::Estimating,
                to: StateKind::Idle,
            });
        }
        inner.transition(CheckoutState::Idle)?;
        inner.quote = None;
        inner.prompt = None;
        inner.epoch += 1;
        Ok(())
    }

    /// Cancel the backend payment record. Refused while a submission for it
    /// is in flight anywhere in the process.
    pub async fn cancel_payment(&self) -> Result<(), CheckoutError> {
        let reference_id = {
            let inner = self.lock();
            inner.ensure_idle_selection()?;
            inner
                .payment
                .reference_id
                .clone()
                .ok_or(CheckoutError::InputIncomplete("payment reference"))?
        };
        if self.registry.is_in_flight(&reference_id) {
            return Err(CheckoutError::SubmissionInFlight);
        }

        if let Err(err) = self.backend.cancel_payment(&reference_id).await {
            tracing::warn!(reference_id = %reference_id, "cancel failed: {err}");
            return Err(err.into());
        }
        self.ensure_live()?;

        let mut inner = self.lock();
        if inner.payment.status.can_transition_to(&PaymentStatus::Cancelled) {
            inner.payment.status = PaymentStatus::Cancelled;
        }
        tracing::info!(reference_id = %reference_id, "payment cancelled");
        Ok(())
    }

    pub fn identity(&self) -> &Address {
        &self.profile.identity
    }
}
