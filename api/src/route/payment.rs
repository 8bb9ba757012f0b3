use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::payment::{
    initialize_payment, show_transaction, show_transaction_list, verify_payment,
};

pub fn build_payment_routers() -> Router<AppRegistry> {
    let payments_routers = Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/verify/:reference", get(verify_payment))
        .route("/transactions", get(show_transaction_list))
        .route("/transactions/:transaction_id", get(show_transaction));

    Router::new().nest("/payments", payments_routers)
}
