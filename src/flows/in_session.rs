// self
use crate::{
	_prelude::*,
	auth::{ActClaim, AgentId, NormalizedTokenResult, ScopeSet, SessionFields},
	flows,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
	provider::VendorAdapter,
	sender::HybridSender,
};

/// Token requester for agents co-located with the application session.
///
/// No assertion is signed; the act claim goes straight to the adapter.
pub struct InSessionTokenRequester<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	sender: HybridSender,
	adapter: VendorAdapter<C, M>,
}
impl<C, M> InSessionTokenRequester<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Pairs a sender with the adapter tokens are requested from.
	pub fn new(sender: HybridSender, adapter: VendorAdapter<C, M>) -> Self {
		Self { sender, adapter }
	}

	/// Adapter tokens are requested from.
	pub fn adapter(&self) -> &VendorAdapter<C, M> {
		&self.adapter
	}

	/// Requests a token for `agent_id` acting on behalf of `act`.
	pub async fn request_token(
		&self,
		agent_id: &AgentId,
		act: ActClaim,
		scopes: &ScopeSet,
	) -> Result<NormalizedTokenResult> {
		flows::require_scopes(scopes)?;

		let act = self.sender.prepare_in_session(act);

		self.adapter.request_token(agent_id, &act, scopes).await
	}

	/// Extracts the act claim from a session record, then requests a token.
	pub async fn request_token_for_session<S>(
		&self,
		agent_id: &AgentId,
		session: &S,
		scopes: &ScopeSet,
	) -> Result<NormalizedTokenResult>
	where
		S: ?Sized + SessionFields,
	{
		let act = self.sender.extract_act_from_session(session)?;

		self.request_token(agent_id, act, scopes).await
	}
}
impl<C, M> Debug for InSessionTokenRequester<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InSessionTokenRequester")
			.field("sender", &self.sender)
			.field("adapter", &self.adapter)
			.finish()
	}
}
