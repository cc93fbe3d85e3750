/// Use [`std::sync::LazyLock`] to define a static "constant" from a string.
///
/// The string is converted into the given type with [`std::str::FromStr::from_str`] on first
/// access, so an invalid literal fails the first test which touches the constant.
///
/// # Examples
///
/// ```rust
/// constant!(ENV_CLUSTER_NAME: EnvVarName = "CLUSTER_NAME");
/// constant!(pub ENV_NAMESPACE: EnvVarName = "NAMESPACE");
/// ```
#[macro_export(local_inner_macros)]
macro_rules! constant {
    ($qualifier:vis $name:ident: $type:ident = $value:literal) => {
        $qualifier static $name: std::sync::LazyLock<$type> = std::sync::LazyLock::new(|| {
            <$type as std::str::FromStr>::from_str($value)
                .expect(std::concat!("should be a valid ", std::stringify!($name)))
        });
    };
}
