//! Session negotiation: resume, complete, or start the OAuth 1.0 handshake.
//!
//! [`Negotiator::connect`] runs in front of every content request. Evidence is checked in a fixed
//! order:
//!
//! 1. a persisted access credential (cache, then durable files) is bound without any network call;
//! 2. a callback carrying `oauth_token` exchanges the pending request credential for an access
//!    credential, persists it to the cache and the durable files, then erases the request pair;
//! 3. otherwise a fresh request credential is issued, stored in the cache only, and the caller
//!    receives [`Error::AuthorizationRequired`] pointing at the remote authorization page.
//!
//! Once bound, the [`AuthSession`] is reused for the lifetime of the process. The check-then-act
//! around the first bind is guarded by a single-flight mutex so concurrent first requests cannot
//! race each other into duplicate handshakes.

// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, RequestCredential},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	remote::{RemoteEntry, RemoteService},
	store::TokenStore,
};

/// Query parameter the remote service appends when it sends the user back.
pub const CALLBACK_PARAM: &str = "oauth_token";
/// Query parameter set by the remote service when the user declined access.
pub const DECLINED_PARAM: &str = "not_approved";

/// Observable negotiator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiatorState {
	/// No session is bound; the next connect resumes, completes, or starts the handshake.
	Uninitialized,
	/// A session is bound and every connect is a no-op.
	Authorized,
}

/// Authorized remote client: the shared service plus the access credential it is bound to.
#[derive(Clone)]
pub struct AuthSession {
	service: Arc<dyn RemoteService>,
	credential: AccessCredential,
}
impl AuthSession {
	/// Binds `credential` to `service`.
	pub fn new(service: Arc<dyn RemoteService>, credential: AccessCredential) -> Self {
		Self { service, credential }
	}

	/// Access credential every call is signed with.
	pub fn credential(&self) -> &AccessCredential {
		&self.credential
	}

	/// Lists files under `root` matching `suffix`.
	pub async fn search(&self, root: &str, suffix: &str) -> Result<Vec<RemoteEntry>> {
		self.service.search(&self.credential, root, suffix).await
	}

	/// Fetches the raw bytes of `path`.
	pub async fn get_file(&self, path: &str) -> Result<Vec<u8>> {
		self.service.get_file(&self.credential, path).await
	}
}
impl Debug for AuthSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthSession").field("credential", &self.credential).finish_non_exhaustive()
	}
}

/// Owns the credential lifecycle for the process.
pub struct Negotiator {
	service: Arc<dyn RemoteService>,
	tokens: TokenStore,
	session: RwLock<Option<Arc<AuthSession>>>,
	singleflight: AsyncMutex<()>,
}
impl Negotiator {
	/// Creates an uninitialized negotiator.
	pub fn new(service: Arc<dyn RemoteService>, tokens: TokenStore) -> Self {
		Self { service, tokens, session: RwLock::new(None), singleflight: AsyncMutex::new(()) }
	}

	/// Credential persistence in use.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Current state of the machine.
	pub fn state(&self) -> NegotiatorState {
		if self.session.read().is_some() {
			NegotiatorState::Authorized
		} else {
			NegotiatorState::Uninitialized
		}
	}

	/// Bound session, if any.
	pub fn current(&self) -> Option<Arc<AuthSession>> {
		self.session.read().clone()
	}

	/// Produces a live session or the redirect signal.
	///
	/// `query` is the current request's query map and `current_url` its absolute URL; the latter
	/// (minus its query string) becomes the callback target when a handshake has to start.
	///
	/// Never returns `Ok` while unauthenticated. An `Err(Error::AuthorizationRequired { .. })`
	/// must travel to the transport layer unconsumed.
	pub async fn connect(
		&self,
		query: &HashMap<String, String>,
		current_url: &Url,
	) -> Result<Arc<AuthSession>> {
		if let Some(session) = self.current() {
			return Ok(session);
		}

		let _singleflight = self.singleflight.lock().await;

		// Another request may have finished the handshake while this one waited.
		if let Some(session) = self.current() {
			return Ok(session);
		}

		let credential = self.negotiate(query, current_url).await?;
		let session = Arc::new(AuthSession::new(self.service.clone(), credential));

		*self.session.write() = Some(session.clone());

		tracing::info!("Remote session authorized.");

		Ok(session)
	}

	/// Drops the bound session and forgets the persisted access credential.
	///
	/// Used when the remote service starts rejecting the credential; the next connect starts a new
	/// handshake.
	pub async fn invalidate(&self) -> Result<()> {
		let _singleflight = self.singleflight.lock().await;

		self.session.write().take();
		self.tokens.forget_access().await?;

		tracing::warn!("Remote session invalidated; the next request restarts authorization.");

		Ok(())
	}

	async fn negotiate(
		&self,
		query: &HashMap<String, String>,
		current_url: &Url,
	) -> Result<AccessCredential> {
		if let Some(credential) = self.resume().await? {
			return Ok(credential);
		}
		if query.contains_key(CALLBACK_PARAM) || query.contains_key(DECLINED_PARAM) {
			if let Some(credential) = self.complete_callback(query).await? {
				return Ok(credential);
			}
		}

		let authorize_url = self.start_handshake(current_url).await?;

		Err(Error::AuthorizationRequired { authorize_url })
	}

	async fn resume(&self) -> Result<Option<AccessCredential>> {
		const STAGE: &str = "resume";

		let span = FlowSpan::new(FlowKind::Connect, STAGE);
		let result: Result<Option<AccessCredential>> = span
			.instrument(async {
				let credential = self.tokens.load_access().await?;

				if credential.is_some() {
					tracing::debug!("Resuming persisted access credential.");
				}

				Ok(credential)
			})
			.await;

		if matches!(result, Ok(Some(_)) | Err(_)) {
			obs::record_flow_outcome(FlowKind::Connect, FlowOutcome::of(&result));
		}

		result
	}

	/// Returns `Ok(None)` when there is no pending request credential to exchange, in which case
	/// the handshake starts over.
	async fn complete_callback(
		&self,
		query: &HashMap<String, String>,
	) -> Result<Option<AccessCredential>> {
		const STAGE: &str = "callback";

		let span = FlowSpan::new(FlowKind::Connect, STAGE);

		obs::record_flow_outcome(FlowKind::Connect, FlowOutcome::Attempt);

		let result: Result<Option<AccessCredential>> = span
			.instrument(async {
				let Some(pending) = self.tokens.load_request().await? else {
					tracing::warn!("Callback arrived without a pending request credential.");

					return Ok(None);
				};

				if query.get(DECLINED_PARAM).is_some_and(|value| value == "true") {
					self.tokens.clear_request().await?;

					return Err(Error::RemoteAuth {
						reason: "The account owner declined the authorization request".into(),
					});
				}

				ensure_callback_matches(&pending, query.get(CALLBACK_PARAM))?;

				let credential = match self.service.obtain_access_token(&pending).await {
					Ok(credential) => credential,
					Err(e @ Error::RemoteAuth { .. }) => {
						// A rejected request credential cannot be exchanged again.
						self.tokens.clear_request().await?;

						return Err(e);
					},
					Err(e) => return Err(e),
				};

				self.tokens.save_access(&credential).await?;
				self.tokens.clear_request().await?;

				Ok(Some(credential))
			})
			.await;

		obs::record_flow_outcome(FlowKind::Connect, FlowOutcome::of(&result));

		result
	}

	async fn start_handshake(&self, current_url: &Url) -> Result<Url> {
		const STAGE: &str = "start";

		let span = FlowSpan::new(FlowKind::Connect, STAGE);

		obs::record_flow_outcome(FlowKind::Connect, FlowOutcome::Attempt);

		let result: Result<Url> = span
			.instrument(async {
				// The pending request credential is reused until its callback arrives.
				let request = match self.tokens.load_request().await? {
					Some(pending) => {
						tracing::debug!("Reusing the pending request credential.");

						pending
					},
					None => {
						let request = self.service.obtain_request_token().await?;

						self.tokens.save_request(&request).await?;

						request
					},
				};
				let callback = callback_url(current_url);
				let authorize_url = self.service.build_authorize_url(&request, &callback);

				tracing::info!(%callback, "Starting remote authorization.");

				Ok(authorize_url)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(FlowKind::Connect, FlowOutcome::Redirect),
			Err(_) => obs::record_flow_outcome(FlowKind::Connect, FlowOutcome::Failure),
		}

		result
	}
}
impl Debug for Negotiator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Negotiator")
			.field("state", &self.state())
			.field("tokens", &self.tokens)
			.finish_non_exhaustive()
	}
}

/// Callback target for the authorization page: the current URL without query or fragment.
pub fn callback_url(current_url: &Url) -> Url {
	let mut callback = current_url.clone();

	callback.set_query(None);
	callback.set_fragment(None);

	callback
}

fn ensure_callback_matches(pending: &RequestCredential, returned: Option<&String>) -> Result<()> {
	match returned {
		Some(token) if token != pending.token() => Err(Error::RemoteAuth {
			reason: "Callback token does not match the pending request credential".into(),
		}),
		_ => Ok(()),
	}
}
