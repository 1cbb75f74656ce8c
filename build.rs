fn main() {
    #[cfg(feature = "i2c-esp32")]
    embuild::espidf::sysenv::output();
}
