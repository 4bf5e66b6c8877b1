pub mod test_email;
