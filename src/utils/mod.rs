pub mod jwt;
pub mod pwd;
pub mod redirect;
pub mod time;
pub mod token;
pub mod validated_form;
pub mod validator;
