#[macro_export]
macro_rules! get_directive {
    ($directives:expr , $name:expr) => {
        $directives.iter().filter(|d| d.name == $name)
    };
}

#[macro_export]
macro_rules! letp {
    ($pat:pat = $expr:expr => $stmt:stmt ) => {
        if let $pat = $expr {
            $stmt
        } else {
            unreachable!()
        }
    };
}
