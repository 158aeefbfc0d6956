//! Static HTML forms for the browser login flow

pub const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Log in - MRI Scan Classifier</title></head>
<body>
  <h1>Log in</h1>
  <form method="post" action="/login">
    <label>Username <input name="username" required></label>
    <label>Password <input name="password" type="password" required></label>
    <button type="submit">Log in</button>
  </form>
  <p><a href="/signup">Create an account</a></p>
</body>
</html>
"#;

pub const SIGNUP_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sign up - MRI Scan Classifier</title></head>
<body>
  <h1>Sign up</h1>
  <form method="post" action="/signup">
    <label>Username <input name="username" maxlength="150" required></label>
    <label>Password <input name="password1" type="password" minlength="8" required></label>
    <label>Password confirmation <input name="password2" type="password" minlength="8" required></label>
    <button type="submit">Sign up</button>
  </form>
  <p><a href="/login">Already have an account? Log in</a></p>
</body>
</html>
"#;
