use axum::{
    routing::{get, patch, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    booking::{
        create_booking, delete_booking, search_bookings, show_all_bookings, show_booking,
        show_booking_list, show_receipt, show_taken_slots, update_booking, update_booking_status,
    },
    payment::{confirm_payment, request_payment},
};

pub fn build_booking_routers() -> Router<AppRegistry> {
    let bookings_routers = Router::new()
        .route("/", post(create_booking).get(show_booking_list))
        .route("/search", get(search_bookings))
        .route("/admin/all", get(show_all_bookings))
        .route("/taken/:space_id", get(show_taken_slots))
        .route(
            "/:booking_id",
            get(show_booking).put(update_booking).delete(delete_booking),
        )
        .route("/:booking_id/status", patch(update_booking_status))
        .route("/:booking_id/payment", get(request_payment))
        .route("/:booking_id/confirm", post(confirm_payment))
        .route("/:booking_id/receipt", get(show_receipt));

    Router::new().nest("/bookings", bookings_routers)
}
