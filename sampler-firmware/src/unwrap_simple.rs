/// Unwrap without pulling `Debug` formatting of the error into the binary.
pub(crate) trait UnwrapSimple {
    type Ok;

    fn unwrap_simple(self) -> Self::Ok;
}

impl<T, E> UnwrapSimple for Result<T, E> {
    type Ok = T;

    fn unwrap_simple(self) -> T {
        match self {
            Ok(v) => v,
            Err(_) => panic!(),
        }
    }
}

impl<T> UnwrapSimple for Option<T> {
    type Ok = T;

    fn unwrap_simple(self) -> T {
        match self {
            Some(v) => v,
            None => panic!(),
        }
    }
}
