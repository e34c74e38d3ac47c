use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOut {
    pub id: i64,
    pub trek_id: i64,
    pub trek_name: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub id_type: String,
    pub id_number: Option<String>,
    pub id_document_path: Option<String>,
    pub participants: i32,
    pub booking_date: String,
    pub amount: BigDecimal,
    pub payment_id: Option<String>,
    pub gateway: String,
    pub status: String,
    /// Display image resolved from the catalog by trek name; read-only decoration.
    pub image: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingCreateOut {
    pub success: bool,
    pub message: String,
    #[serde(rename = "bookingId")]
    pub booking_id: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingsListOut {
    pub success: bool,
    pub bookings: Vec<BookingOut>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct BookingDetailOut {
    pub success: bool,
    pub booking: BookingOut,
}

#[derive(Debug, Serialize)]
pub struct BookingCancelOut {
    pub success: bool,
    pub message: String,
    pub booking: BookingOut,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderReq {
    /// Positive integer in the gateway's minor currency unit.
    pub amount: i64,
    #[serde(default)]
    pub activity_id: Option<i64>,
    #[serde(default)]
    pub activity_name: Option<String>,
    #[serde(default)]
    pub num_participants: Option<i32>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderOut {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

// The proof fields keep the gateway's own snake_case names; the rest of
// the payload follows the API's camelCase convention.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentReq {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    #[serde(default, rename = "activityId")]
    pub activity_id: Option<i64>,
    #[serde(default, rename = "numParticipants")]
    pub num_participants: Option<i32>,
    #[serde(default)]
    pub gateway: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentOut {
    pub success: bool,
    pub message: String,
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "activityId")]
    pub activity_id: Option<i64>,
    #[serde(rename = "numParticipants")]
    pub num_participants: Option<i32>,
    pub gateway: String,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub env: String,
    pub service: &'static str,
    pub version: &'static str,
}
