mod paystack;

pub use paystack::PaystackClient;
