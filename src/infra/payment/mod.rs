pub mod http_wallet_service;
