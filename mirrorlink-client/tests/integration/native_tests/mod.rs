mod test_sessions_negotiate_through_relay;
mod test_webrtc_exchange_with_queued_candidates;
